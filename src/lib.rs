// src/lib.rs
// Public library surface for the server, the CLI tools and integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod digest;
pub mod enrich;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod publish;
pub mod rank;
pub mod scoring;
pub mod service;
pub mod source_weights;
pub mod text;

pub use crate::api::{create_router, AppState};
pub use crate::service::DigestService;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact stderr logs for the command-line tools; `RUST_LOG` overrides the default filter.
pub fn init_cli_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_intel_digest=info,warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}
