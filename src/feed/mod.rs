// src/feed/mod.rs
pub mod rss;
pub mod search;
pub mod types;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use metrics::counter;
use reqwest::Client;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};
use tracing::warn;

use crate::config::{AppConfig, FeedSource};
use crate::error::FeedError;
use search::SearchClient;
pub use types::{FeedItem, FeedProvider, RawEntry};

const USER_AGENT: &str = "news-intel-digest/0.1 (+https://newsintel.noetex.ai)";

/// Parse RFC 2822 (`pubDate`) or RFC 3339 (Atom, Dublin Core, search APIs).
pub fn parse_published(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc2822) {
        let ms = (dt.unix_timestamp_nanos() / 1_000_000) as i64;
        return Utc.timestamp_millis_opt(ms).single();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Items of one category fetch: successful items plus one placeholder per failed source.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub items: Vec<FeedItem>,
    pub failures: Vec<FeedItem>,
}

/// Fetch every source concurrently and join. A failing source never aborts the others.
pub async fn fetch_sources(provider: &dyn FeedProvider, sources: &[FeedSource]) -> FetchOutcome {
    let tasks = sources.iter().map(|src| async move {
        counter!("feed_fetch_total").increment(1);
        match provider.fetch(src).await {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(target: "feed", error = ?e, source = src.label(), provider = provider.name(), "feed fetch failed");
                counter!("feed_fetch_errors_total").increment(1);
                Err(FeedItem::fetch_failed(src))
            }
        }
    });

    let mut out = FetchOutcome::default();
    for res in join_all(tasks).await {
        match res {
            Ok(mut items) => out.items.append(&mut items),
            Err(placeholder) => out.failures.push(placeholder),
        }
    }
    out
}

/// Production provider: RSS over HTTP, plus the search API when configured.
pub struct HttpFeedProvider {
    client: Client,
    search: Option<SearchClient>,
}

impl HttpFeedProvider {
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(cfg.feed_timeout)
            .build()
            .context("building feed http client")?;
        let search = cfg
            .search
            .clone()
            .map(|s| SearchClient::new(client.clone(), s));
        Ok(Self { client, search })
    }

    async fn fetch_rss(&self, url: &str, label: &str) -> Result<Vec<FeedItem>> {
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
        let body = resp
            .text()
            .await
            .context("feed body")?;
        let parsed = rss::parse_feed(&body).with_context(|| format!("parsing {url}"))?;
        let feed_title = parsed.title.as_deref();
        Ok(parsed
            .entries
            .into_iter()
            .map(|e| FeedItem::from_entry(e, label, feed_title))
            .collect())
    }
}

#[async_trait]
impl FeedProvider for HttpFeedProvider {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>> {
        match source {
            FeedSource::Rss { url, source } => self.fetch_rss(url, source).await,
            FeedSource::Search { query, source } => {
                let Some(search) = &self.search else {
                    return Err(FeedError::NotConfigured("search api").into());
                };
                let entries = search.search(query).await?;
                Ok(entries
                    .into_iter()
                    .map(|e| {
                        // Search results are labelled by publication domain, not by the query.
                        let label = crate::text::domain(&e.link);
                        let label = if label == "unknown" { source.clone() } else { label };
                        FeedItem::from_entry(e, &label, None)
                    })
                    .collect())
            }
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;

    struct Fixture(HashMap<String, Result<Vec<FeedItem>, String>>);

    #[async_trait]
    impl FeedProvider for Fixture {
        async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>> {
            match self.0.get(source.locator()) {
                Some(Ok(v)) => Ok(v.clone()),
                Some(Err(e)) => Err(anyhow!(e.clone())),
                None => Err(anyhow!("unknown source")),
            }
        }
        fn name(&self) -> &'static str {
            "fixture"
        }
    }

    fn item(title: &str, link: &str) -> FeedItem {
        FeedItem::from_entry(
            RawEntry {
                title: title.into(),
                link: link.into(),
                ..Default::default()
            },
            "S",
            None,
        )
    }

    #[test]
    fn parses_both_date_styles() {
        let a = parse_published("Tue, 10 Jun 2025 08:00:00 GMT").unwrap();
        let b = parse_published("2025-06-10T08:00:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_published("yesterday").is_none());
        assert!(parse_published("   ").is_none());
    }

    #[tokio::test]
    async fn failing_source_becomes_placeholder() {
        let mut m = HashMap::new();
        m.insert(
            "https://ok.example/rss".to_string(),
            Ok(vec![item("one", "https://ok.example/1")]),
        );
        m.insert("https://bad.example/rss".to_string(), Err("boom".to_string()));
        let provider = Fixture(m);
        let sources = vec![
            FeedSource::rss("https://ok.example/rss", "OK"),
            FeedSource::rss("https://bad.example/rss", "Bad"),
        ];

        let out = fetch_sources(&provider, &sources).await;
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.failures.len(), 1);
        let p = &out.failures[0];
        assert!(p.error);
        assert_eq!(p.title, "抓取失败：Bad");
        assert_eq!(p.link, "https://bad.example/rss");
    }
}
