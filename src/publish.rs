// src/publish.rs
//! Client side of the home digest: build a snapshot from a running server, publish it to one.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::api::ADMIN_TOKEN_HEADER;
use crate::digest::{self, CategoryPayload, Digest};
use crate::enrich::summarize::readable_for_display;
use crate::error::PublishError;
use crate::rank;
use crate::text;

/// Categories that make up the home digest, in page order.
pub const HOME_CATEGORY_IDS: [&str; 3] = ["media", "research", "trends"];

pub struct DigestClient {
    http: Client,
    base_url: String,
}

impl DigestClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent("news-intel-digest/0.1")
            .connect_timeout(Duration::from_secs(10))
            // A forced refresh runs the whole pipeline server-side.
            .timeout(Duration::from_secs(180))
            .build()
            .context("building digest http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `GET /api/category/{id}?refresh=1`
    pub async fn fetch_category(&self, id: &str) -> Result<CategoryPayload> {
        let url = format!("{}/api/category/{id}?refresh=1", self.base_url);
        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("{id}: HTTP {}", status.as_u16()));
        }
        resp.json().await.with_context(|| format!("{id}: decoding category payload"))
    }

    /// `POST /api/admin/publish-home`. Non-2xx answers become `PublishError::Remote`.
    pub async fn publish(&self, token: &str, snapshot: &Value) -> Result<Value> {
        let url = format!("{}/api/admin/publish-home", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header(ADMIN_TOKEN_HEADER, token)
            .json(snapshot)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PublishError::Remote {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

/// Keep readable summaries only, dedupe within each category and then across categories
/// (earlier categories win). Keys use the displayed title.
pub fn assemble_home_digest(categories: Vec<CategoryPayload>) -> Digest {
    let now_ms = Utc::now().timestamp_millis();
    let mut categories: Vec<CategoryPayload> = categories
        .into_iter()
        .map(|mut c| {
            let items = c
                .items
                .into_iter()
                .filter(|it| !it.error && readable_for_display(&it.summary))
                .map(|mut it| {
                    it.summary = text::squash_ws(&it.summary);
                    it
                })
                .collect();
            c.items = rank::dedupe_by(items, rank::display_dedupe_key);
            c.updated_at = now_ms;
            c
        })
        .collect();

    let mut lists: Vec<_> = categories.iter_mut().map(|c| std::mem::take(&mut c.items)).collect();
    rank::dedupe_across(&mut lists, rank::display_dedupe_key);
    for (c, items) in categories.iter_mut().zip(lists) {
        c.items = items;
    }
    Digest::new(categories)
}

/// Fetch the home categories one after another, assemble and write the snapshot.
pub async fn build_home_digest(client: &DigestClient, ids: &[&str], out: &Path) -> Result<Digest> {
    let mut fetched = Vec::with_capacity(ids.len());
    for id in ids {
        let payload = client.fetch_category(id).await?;
        info!(target: "publish", category = id, items = payload.items.len(), "category fetched");
        fetched.push(payload);
    }
    let d = assemble_home_digest(fetched);
    digest::store_snapshot(out.to_path_buf(), d)
        .await
        .with_context(|| format!("writing {}", out.display()))
}

/// Read the snapshot file and post it as-is.
pub async fn publish_home_digest(client: &DigestClient, token: &str, file: &Path) -> Result<Value> {
    if token.trim().is_empty() {
        return Err(PublishError::TokenNotConfigured.into());
    }
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let snapshot: Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;
    client.publish(token, &snapshot).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedItem, RawEntry};

    const READABLE: &str = "研究人员发布了新的开源模型，在多项推理基准测试中取得了领先成绩，并公开了训练细节。";

    fn item(link: &str, title_zh: &str, summary: &str) -> FeedItem {
        let mut it = FeedItem::from_entry(
            RawEntry {
                title: "English title".into(),
                link: link.into(),
                ..Default::default()
            },
            "S",
            None,
        );
        it.title_zh = title_zh.into();
        it.summary = summary.into();
        it
    }

    fn cat(id: &str, items: Vec<FeedItem>) -> CategoryPayload {
        CategoryPayload {
            id: id.into(),
            name: id.into(),
            zh_name: String::new(),
            description: String::new(),
            zh_description: String::new(),
            updated_at: 0,
            items,
        }
    }

    #[test]
    fn filters_unreadable_and_dedupes_across_categories() {
        let media = cat(
            "media",
            vec![
                item("https://a.example/1", "新模型", READABLE),
                item("https://a.example/1", "新模型", READABLE),
                item("https://a.example/2", "英文摘要", "An English-only summary that should be dropped."),
            ],
        );
        let research = cat(
            "research",
            vec![
                item("https://a.example/1", "新模型", READABLE),
                item("https://b.example/3", "另一篇", &format!("  {READABLE}  ")),
            ],
        );
        let d = assemble_home_digest(vec![media, research]);
        assert_eq!(d.categories[0].items.len(), 1);
        assert_eq!(d.categories[1].items.len(), 1);
        assert_eq!(d.categories[1].items[0].link, "https://b.example/3");
        assert_eq!(d.categories[1].items[0].summary, READABLE);
        assert!(d.categories.iter().all(|c| c.updated_at > 0));
    }

    #[tokio::test]
    async fn publish_requires_token() {
        let client = DigestClient::new("http://127.0.0.1:9").unwrap();
        let err = publish_home_digest(&client, " ", Path::new("missing.json"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PublishError>(),
            Some(PublishError::TokenNotConfigured)
        ));
    }
}
