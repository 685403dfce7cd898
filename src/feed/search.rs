// src/feed/search.rs
//! Client for a web/news search API (Tavily-style JSON). Results carry a relevance score
//! that the scorer folds into the item score.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::types::RawEntry;
use crate::config::SearchConfig;

const DEFAULT_MAX_RESULTS: usize = 10;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    topic: &'a str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default, alias = "publishedDate")]
    published_date: Option<String>,
}

pub struct SearchClient {
    client: Client,
    cfg: SearchConfig,
    max_results: usize,
}

impl SearchClient {
    pub fn new(client: Client, cfg: SearchConfig) -> Self {
        Self {
            client,
            cfg,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    #[instrument(skip(self), target = "feed")]
    pub async fn search(&self, query: &str) -> Result<Vec<RawEntry>> {
        let req = SearchRequest {
            query,
            max_results: self.max_results,
            topic: "news",
            include_answer: false,
        };
        let resp = self
            .client
            .post(&self.cfg.api_url)
            .bearer_auth(&self.cfg.api_key)
            .json(&req)
            .send()
            .await
            .context("search http post")?
            .error_for_status()
            .context("search non-2xx")?;
        let body: SearchResponse = resp.json().await.context("search json body")?;
        debug!(target: "feed", results = body.results.len(), "search results");
        Ok(results_to_entries(body.results))
    }
}

fn results_to_entries(results: Vec<SearchResult>) -> Vec<RawEntry> {
    results
        .into_iter()
        .filter(|r| !r.url.trim().is_empty())
        .map(|r| RawEntry {
            title: r.title,
            link: r.url,
            summary: r.content,
            published: r.published_date,
            tags: Vec::new(),
            relevance: r.score.map(|s| s.clamp(0.0, 1.0)),
        })
        .collect()
}
