//! news-intel-digest server entrypoint.
//! Boots the Axum HTTP server with the digest service, the publish endpoint and /metrics.

use news_intel_digest::config::AppConfig;
use news_intel_digest::metrics::Metrics;
use news_intel_digest::{api, AppState};
use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let cfg = AppConfig::from_env();
    let state = AppState::from_config(&cfg)?;
    let mut router = api::create_router(state);

    match Metrics::init(cfg.cache_ttl.as_secs()) {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => warn!(error = ?e, "metrics disabled"),
    }

    info!(
        base_url = %cfg.base_url,
        digest_file = %cfg.digest_file.display(),
        enrich = cfg.enrich_enabled,
        publish = cfg.admin_token.is_some(),
        "news-intel-digest starting"
    );
    Ok(router.into())
}
