// src/enrich/mod.rs
//! Per-item enrichment: Chinese title and readable summary. Never fails; every step
//! degrades through its fallback chain.

pub mod cache;
pub mod extract;
pub mod llm;
pub mod summarize;
pub mod translate;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::feed::FeedItem;
pub use cache::EnrichCache;
use extract::{HttpPageFetcher, PageFetcher};
use llm::{DisabledProvider, DynLlm};
use translate::{HttpTranslationEndpoint, TitleStage, TranslationEndpoint};

pub struct Enricher {
    llm: DynLlm,
    endpoint: Option<Arc<dyn TranslationEndpoint>>,
    pages: Option<Arc<dyn PageFetcher>>,
    cache: Arc<EnrichCache>,
}

impl Enricher {
    pub fn new(
        llm: DynLlm,
        endpoint: Option<Arc<dyn TranslationEndpoint>>,
        pages: Option<Arc<dyn PageFetcher>>,
        cache: Arc<EnrichCache>,
    ) -> Self {
        Self {
            llm,
            endpoint,
            pages,
            cache,
        }
    }

    /// No network: phrase-map titles and truncated summaries only.
    pub fn offline(cache: Arc<EnrichCache>) -> Self {
        Self::new(Arc::new(DisabledProvider), None, None, cache)
    }

    /// Full chain when enrichment is enabled, offline otherwise.
    pub fn from_config(cfg: &AppConfig, cache: Arc<EnrichCache>) -> Result<Self> {
        if !cfg.enrich_enabled {
            info!(target: "enrich", "enrichment disabled; using offline fallbacks");
            return Ok(Self::offline(cache));
        }
        let llm = llm::build_provider(cfg.llm.as_ref())?;
        let endpoint = match &cfg.translate_url {
            Some(url) => Some(Arc::new(HttpTranslationEndpoint::new(url.clone())?) as Arc<dyn TranslationEndpoint>),
            None => None,
        };
        let pages: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new(Duration::from_secs(10))?);
        info!(
            target: "enrich",
            llm = llm.name(),
            endpoint = endpoint.is_some(),
            "enrichment enabled"
        );
        Ok(Self::new(llm, endpoint, Some(pages), cache))
    }

    pub fn cache(&self) -> &Arc<EnrichCache> {
        &self.cache
    }

    /// Enrich one item. Placeholders pass through untouched.
    pub async fn enrich_item(&self, mut item: FeedItem) -> FeedItem {
        if item.error {
            return item;
        }

        let (title_zh, title_stage) = translate::translate_title(
            &item.title,
            self.llm.as_ref(),
            self.endpoint.as_deref(),
            &self.cache,
        )
        .await;
        item.title_zh = title_zh;

        let body = match &self.pages {
            Some(pages) => extract::source_text(pages.as_ref(), &item.link, &item.raw_summary).await,
            None => None,
        }
        .unwrap_or_else(|| extract::strip_arxiv_announce(&item.raw_summary));

        let hint = (title_stage != TitleStage::Wrapped).then_some(item.title_zh.as_str());
        let (summary, summary_stage) =
            summarize::summarize(&item.title, hint, &body, self.llm.as_ref(), &self.cache).await;
        item.summary = summary;

        debug!(
            target: "enrich",
            title = %item.title,
            title_stage = title_stage.as_str(),
            summary_stage = summary_stage.as_str(),
            "item enriched"
        );
        item
    }

    /// Enrich concurrently; output order matches input order.
    pub async fn enrich_all(&self, items: Vec<FeedItem>) -> Vec<FeedItem> {
        join_all(items.into_iter().map(|it| self.enrich_item(it))).await
    }
}
