//! Build the home digest snapshot from a running server.
//!
//! GETs `/api/category/{id}?refresh=1` for the home categories, keeps readable summaries,
//! dedupes, and writes `HOME_DIGEST_OUT` (default `data/home-latest.json`).

use std::process::ExitCode;

use news_intel_digest::config::AppConfig;
use news_intel_digest::publish::{build_home_digest, DigestClient, HOME_CATEGORY_IDS};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    news_intel_digest::init_cli_tracing();

    let cfg = AppConfig::from_env();
    let out = std::env::var("HOME_DIGEST_OUT")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| cfg.digest_file.clone());

    let run = async {
        let client = DigestClient::new(&cfg.base_url)?;
        build_home_digest(&client, &HOME_CATEGORY_IDS, &out).await
    };

    match run.await {
        Ok(d) => {
            let items: usize = d.categories.iter().map(|c| c.items.len()).sum();
            tracing::info!(path = %out.display(), items, "home digest saved");
            println!("Saved {}", out.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = ?e, "build_home_digest failed");
            eprintln!("build_home_digest: {e:#}");
            ExitCode::FAILURE
        }
    }
}
