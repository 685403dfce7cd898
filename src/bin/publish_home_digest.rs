//! Publish the local home digest snapshot to `{WEBAPP_BASE_URL}/api/admin/publish-home`.
//! Requires `ADMIN_PUBLISH_TOKEN`.

use std::process::ExitCode;

use news_intel_digest::config::AppConfig;
use news_intel_digest::publish::{publish_home_digest, DigestClient};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    news_intel_digest::init_cli_tracing();

    let cfg = AppConfig::from_env();
    let Some(token) = cfg.admin_token.clone() else {
        eprintln!("publish_home_digest: ADMIN_PUBLISH_TOKEN is required");
        return ExitCode::FAILURE;
    };

    let run = async {
        let client = DigestClient::new(&cfg.base_url)?;
        publish_home_digest(&client, &token, &cfg.digest_file).await
    };

    match run.await {
        Ok(resp) => {
            println!("{resp}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = ?e, "publish_home_digest failed");
            eprintln!("publish_home_digest: {e:#}");
            ExitCode::FAILURE
        }
    }
}
