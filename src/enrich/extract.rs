// src/enrich/extract.rs
//! Article body extraction for items whose feed summary is missing or boilerplate.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::FeedError;
use crate::text;

/// Raw summaries shorter than this are treated as missing.
pub const MIN_RAW_SUMMARY_CHARS: usize = 40;
/// Shortest paragraph accepted by the first-paragraph heuristic.
pub const MIN_PARAGRAPH_CHARS: usize = 80;
/// Extracted text handed to the summarizer is capped at this many chars.
pub const MAX_EXTRACT_CHARS: usize = 2_000;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// HTML of the page at `url`.
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; news-intel-digest/0.1)")
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .context("building page http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        if !resp.status().is_success() {
            return Err(FeedError::Status {
                status: resp.status().as_u16(),
                url: url.to_string(),
            }
            .into());
        }
        resp.text().await.context("page body")
    }
}

fn re_boilerplate() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(comments|read more|continue reading|article url:|comments url:|points:|\[link\]|submitted by)")
            .expect("boilerplate regex")
    })
}

fn re_arxiv_announce() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^arxiv:\S+\s+announce type:\s*\S+\s*(abstract:\s*)?").expect("arxiv regex")
    })
}

fn re_arxiv_abstract() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<blockquote[^>]*class="[^"]*abstract[^"]*"[^>]*>(.*?)</blockquote>"#)
            .expect("abstract regex")
    })
}

fn re_meta() -> &'static [Regex] {
    static RE: OnceCell<Vec<Regex>> = OnceCell::new();
    RE.get_or_init(|| {
        [
            r#"(?is)<meta[^>]+(?:name|property)\s*=\s*["'](?:og:description|description|twitter:description)["'][^>]*?content\s*=\s*"([^"]*)""#,
            r#"(?is)<meta[^>]+content\s*=\s*"([^"]*)"[^>]*?(?:name|property)\s*=\s*["'](?:og:description|description|twitter:description)["']"#,
        ]
        .iter()
        .map(|p| Regex::new(p).expect("meta regex"))
        .collect()
    })
}

fn re_paragraph() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").expect("paragraph regex"))
}

/// Strip the `arXiv:XXXX Announce Type: new Abstract:` prefix arXiv puts in its RSS descriptions.
pub fn strip_arxiv_announce(s: &str) -> String {
    re_arxiv_announce().replace(s.trim(), "").trim().to_string()
}

/// Summary text that carries no content of its own.
pub fn is_boilerplate(summary: &str) -> bool {
    let s = text::clean(summary);
    s.chars().count() < MIN_RAW_SUMMARY_CHARS || re_boilerplate().is_match(&s)
}

/// Best body text of a page: abstract block, then meta description, then first long paragraph.
pub fn extract_body(html: &str) -> Option<String> {
    let pick = |s: &str| {
        let t = text::clean(s);
        (!t.is_empty()).then(|| text::truncate_chars(&t, MAX_EXTRACT_CHARS))
    };

    if let Some(c) = re_arxiv_abstract().captures(html) {
        let body = c.get(1).map(|m| m.as_str()).unwrap_or_default();
        let body = text::clean(body);
        let body = body
            .strip_prefix("Abstract:")
            .map(str::trim)
            .unwrap_or(&body);
        if let Some(t) = pick(body) {
            return Some(t);
        }
    }

    for re in re_meta() {
        if let Some(t) = re
            .captures(html)
            .and_then(|c| c.get(1))
            .and_then(|m| pick(m.as_str()))
        {
            if t.chars().count() >= MIN_RAW_SUMMARY_CHARS {
                return Some(t);
            }
        }
    }

    re_paragraph()
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| text::clean(m.as_str()))
        .find(|p| p.chars().count() >= MIN_PARAGRAPH_CHARS)
        .map(|p| text::truncate_chars(&p, MAX_EXTRACT_CHARS))
}

/// Text to summarize for an item: the feed summary when usable, the fetched page otherwise.
pub async fn source_text(fetcher: &dyn PageFetcher, link: &str, raw_summary: &str) -> Option<String> {
    let raw = strip_arxiv_announce(raw_summary);
    if !is_boilerplate(&raw) {
        return Some(text::truncate_chars(&raw, MAX_EXTRACT_CHARS));
    }
    if !(link.starts_with("http://") || link.starts_with("https://")) {
        return None;
    }
    match fetcher.fetch_html(link).await {
        Ok(html) => extract_body(&html),
        Err(e) => {
            tracing::debug!(target: "enrich", error = ?e, link, "page fetch failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Page(String);

    #[async_trait]
    impl PageFetcher for Page {
        async fn fetch_html(&self, _url: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    const LONG: &str = "Researchers trained a model on thousands of recordings and found that it predicts neural responses far better than earlier baselines.";

    #[test]
    fn detects_boilerplate() {
        assert!(is_boilerplate(""));
        assert!(is_boilerplate("Comments"));
        assert!(is_boilerplate(
            "Article URL: https://example.com/x Comments URL: https://news.ycombinator.com/item?id=1 Points: 3"
        ));
        assert!(!is_boilerplate(LONG));
    }

    #[test]
    fn arxiv_prefix_is_stripped() {
        let s = format!("arXiv:2406.01234v1 Announce Type: new Abstract: {LONG}");
        assert_eq!(strip_arxiv_announce(&s), LONG);
    }

    #[test]
    fn prefers_abstract_block() {
        let html = format!(
            r#"<meta name="description" content="meta text that is long enough to be accepted here ok"><blockquote class="abstract mathjax"><span>Abstract:</span> {LONG}</blockquote>"#
        );
        assert_eq!(extract_body(&html).as_deref(), Some(LONG));
    }

    #[test]
    fn falls_back_to_meta_then_paragraph() {
        let html = r#"<head><meta property="og:description" content="A sufficiently long meta description of the article body."></head>"#;
        assert_eq!(
            extract_body(html).as_deref(),
            Some("A sufficiently long meta description of the article body.")
        );

        let html = format!("<p>short</p><p class=\"lead\">{LONG}</p>");
        assert_eq!(extract_body(&html).as_deref(), Some(LONG));
        assert_eq!(extract_body("<p>tiny</p>"), None);
    }

    #[tokio::test]
    async fn source_text_uses_feed_summary_when_usable() {
        let page = Page("<p>never fetched</p>".into());
        let t = source_text(&page, "https://x.example", LONG).await;
        assert_eq!(t.as_deref(), Some(LONG));

        let page = Page(format!("<p>{LONG}</p>"));
        let t = source_text(&page, "https://x.example", "Comments").await;
        assert_eq!(t.as_deref(), Some(LONG));
        assert_eq!(source_text(&page, "not a url", "").await, None);
    }
}
