use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time descriptions so every series shows up on /metrics with help text.
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_fetch_total", "Feed source fetch attempts.");
        describe_counter!("feed_fetch_errors_total", "Feed sources that failed to fetch or parse.");
        describe_histogram!("feed_parse_ms", "Feed document parse time in milliseconds.");
        describe_counter!("digest_cache_hits_total", "Category payloads served from the TTL cache.");
        describe_counter!("digest_cache_misses_total", "Category payloads recomputed.");
        describe_counter!(
            "pipeline_dropped_total",
            "Items dropped by the exclusion filters, by reason."
        );
        describe_counter!(
            "enrich_fallback_total",
            "Enrichment results by chain (title/summary) and the stage that produced them."
        );
        describe_counter!("publish_total", "Home digest publish attempts, by outcome.");
        describe_gauge!("digest_cache_ttl_secs", "Configured category cache TTL in seconds.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if a recorder is already installed.
    pub fn init(ttl_secs: u64) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_metrics();
        gauge!("digest_cache_ttl_secs").set(ttl_secs as f64);
        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
