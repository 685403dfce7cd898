// src/service.rs
//! Per-category pipeline plus the TTL cache in front of it.
//!
//! fetch → filter/tag → score/sort → dedupe → per-source cap (candidate pool)
//!       → topic rebalance → enrich

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::counter;
use tracing::{debug, info};

use crate::classify;
use crate::config::{categories, AppConfig, CategoryConfig, PipelineRules};
use crate::digest::CategoryPayload;
use crate::enrich::{EnrichCache, Enricher};
use crate::feed::{self, FeedItem, FeedProvider, HttpFeedProvider};
use crate::rank;
use crate::scoring;
use crate::source_weights::{SourceWeightsConfig, DEFAULT_SOURCE_WEIGHTS_PATH};

struct CachedCategory {
    payload: CategoryPayload,
    stored: Instant,
}

pub struct DigestService {
    categories: Vec<CategoryConfig>,
    provider: Arc<dyn FeedProvider>,
    rules: Arc<PipelineRules>,
    weights: Arc<SourceWeightsConfig>,
    enricher: Enricher,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedCategory>>,
}

impl DigestService {
    pub fn new(
        categories: Vec<CategoryConfig>,
        provider: Arc<dyn FeedProvider>,
        rules: Arc<PipelineRules>,
        weights: Arc<SourceWeightsConfig>,
        enricher: Enricher,
        ttl: Duration,
    ) -> Self {
        Self {
            categories,
            provider,
            rules,
            weights,
            enricher,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Production wiring: HTTP feeds, file-backed rules, enrichment per `cfg`.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let categories = categories::load_categories_default()?;
        let rules = Arc::new(PipelineRules::load_default()?);
        let weights = Arc::new(SourceWeightsConfig::load_from_file(DEFAULT_SOURCE_WEIGHTS_PATH));
        let provider: Arc<dyn FeedProvider> = Arc::new(HttpFeedProvider::from_config(cfg)?);
        let enricher = Enricher::from_config(cfg, Arc::new(EnrichCache::new()))?;
        info!(
            target: "service",
            categories = categories.len(),
            ttl_secs = cfg.cache_ttl.as_secs(),
            "digest service ready"
        );
        Ok(Self::new(categories, provider, rules, weights, enricher, cfg.cache_ttl))
    }

    pub fn categories(&self) -> &[CategoryConfig] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn enrich_cache(&self) -> &Arc<EnrichCache> {
        self.enricher.cache()
    }

    /// Cached payload for `id`, recomputed when stale or when `force` is set.
    /// `None` for unknown ids.
    pub async fn get_category(&self, id: &str, force: bool) -> Option<CategoryPayload> {
        let cat = self.category(id)?;
        if force {
            self.enricher.cache().clear();
        }
        Some(self.get_or_compute(cat, force).await)
    }

    /// Every `home` category, computed concurrently, in configuration order.
    pub async fn home_categories(&self, force: bool) -> Vec<CategoryPayload> {
        if force {
            self.enricher.cache().clear();
        }
        let tasks = self
            .categories
            .iter()
            .filter(|c| c.home)
            .map(|c| self.get_or_compute(c, force));
        join_all(tasks).await
    }

    fn cached(&self, id: &str) -> Option<CategoryPayload> {
        let g = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        g.get(id)
            .filter(|c| c.stored.elapsed() < self.ttl)
            .map(|c| c.payload.clone())
    }

    async fn get_or_compute(&self, cat: &CategoryConfig, force: bool) -> CategoryPayload {
        if !force {
            if let Some(hit) = self.cached(&cat.id) {
                counter!("digest_cache_hits_total").increment(1);
                return hit;
            }
        }
        counter!("digest_cache_misses_total").increment(1);

        let items = self.build_items(cat, Utc::now()).await;
        let payload = CategoryPayload::new(cat, items);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                cat.id.clone(),
                CachedCategory {
                    payload: payload.clone(),
                    stored: Instant::now(),
                },
            );
        payload
    }

    /// Run the full pipeline for one category.
    pub async fn build_items(&self, cat: &CategoryConfig, now: DateTime<Utc>) -> Vec<FeedItem> {
        let t0 = Instant::now();
        let outcome = feed::fetch_sources(self.provider.as_ref(), &cat.feeds).await;
        if outcome.items.is_empty() {
            let mut failures = outcome.failures;
            failures.truncate(cat.limit);
            return failures;
        }
        let fetched = outcome.items.len();

        let selected = select(&self.rules, &self.weights, cat, outcome.items, now);
        let items = self.enricher.enrich_all(selected).await;

        debug!(
            target: "service",
            category = %cat.id,
            fetched,
            failed_sources = outcome.failures.len(),
            selected = items.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "category built"
        );
        items
    }
}

/// Synchronous part of the pipeline: everything between fetching and enrichment.
pub fn select(
    rules: &PipelineRules,
    weights: &SourceWeightsConfig,
    cat: &CategoryConfig,
    items: Vec<FeedItem>,
    now: DateTime<Utc>,
) -> Vec<FeedItem> {
    // Dedupe in fetch order so the first-seen copy wins regardless of score.
    let unique = rank::dedupe(items);
    let mut kept = classify::filter_and_tag(rules, unique, cat.require_in_scope);
    scoring::score_and_sort(rules, weights, &mut kept, now);

    let sel = &rules.selection;
    let pool_size = cat.limit.saturating_mul(sel.pool_multiplier.max(1));
    let pool = rank::select_with_source_cap(&kept, sel.per_source_cap, pool_size);
    rank::rebalance(&pool, &rules.topic_order(), sel.per_topic_quota, cat.limit)
}
