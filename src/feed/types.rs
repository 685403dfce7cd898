// src/feed/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::FeedSource;
use crate::text;

/// One entry as it comes out of a parser or a search API, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: Option<String>,
    pub tags: Vec<String>,
    /// Relevance reported by a search API, `[0, 1]`.
    pub relevance: Option<f64>,
}

/// A normalized digest item. Serialized in the camelCase shape the page and snapshot use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub title: String,
    #[serde(default)]
    pub title_zh: String,
    pub source: String,
    pub link: String,
    /// Display summary (enriched when enrichment ran).
    #[serde(default)]
    pub summary: String,
    /// Feed-provided description, cleaned. Input to enrichment only.
    #[serde(skip)]
    pub raw_summary: String,
    #[serde(default)]
    pub published_at: String,
    /// Unix milliseconds; 0 when unknown.
    #[serde(default)]
    pub ts: i64,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FeedItem {
    /// Normalize a parsed entry: clean text, unwrap redirect links, parse the timestamp.
    /// `source_label` wins over the feed title; the link's domain is the last resort.
    pub fn from_entry(entry: RawEntry, source_label: &str, feed_title: Option<&str>) -> Self {
        let link = text::resolve_redirect(entry.link.trim());
        let mut title = text::clean(&entry.title);
        if title.is_empty() {
            title = "Untitled".to_string();
        }
        let source = if !source_label.trim().is_empty() {
            source_label.trim().to_string()
        } else {
            feed_title
                .map(text::clean)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| text::domain(&link))
        };
        let (published_at, ts) = match entry.published.as_deref().and_then(super::parse_published) {
            Some(dt) => (dt.to_rfc3339(), dt.timestamp_millis()),
            None => (entry.published.unwrap_or_default(), 0),
        };
        let tags = entry
            .tags
            .iter()
            .map(|t| text::clean(t))
            .filter(|t| !t.is_empty())
            .collect();

        Self {
            title,
            title_zh: String::new(),
            source,
            link,
            summary: String::new(),
            raw_summary: text::clean(&entry.summary),
            published_at,
            ts,
            score: 0.0,
            topic: String::new(),
            tags,
            relevance: entry.relevance.filter(|r| r.is_finite()),
            error: false,
        }
    }

    /// Placeholder emitted when a feed cannot be fetched or parsed.
    pub fn fetch_failed(source: &FeedSource) -> Self {
        let title = format!("抓取失败：{}", source.label());
        Self {
            title: title.clone(),
            title_zh: title,
            source: source.label().to_string(),
            link: source.locator().to_string(),
            summary: String::new(),
            raw_summary: String::new(),
            published_at: String::new(),
            ts: 0,
            score: 0.0,
            topic: String::new(),
            tags: Vec::new(),
            relevance: None,
            error: true,
        }
    }

    /// Title shown to readers: translated when available.
    pub fn display_title(&self) -> &str {
        if self.title_zh.trim().is_empty() {
            &self.title
        } else {
            &self.title_zh
        }
    }

    /// Text the classifiers look at.
    pub fn haystack(&self) -> String {
        let mut s = String::with_capacity(self.title.len() + self.raw_summary.len() + 32);
        s.push_str(&self.title);
        s.push(' ');
        s.push_str(&self.raw_summary);
        for t in &self.tags {
            s.push(' ');
            s.push_str(t);
        }
        s
    }
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    /// Fetch and normalize every item of one source. One attempt, no retries.
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>>;
    fn name(&self) -> &'static str;
}
