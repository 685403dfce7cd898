//! Typed errors for the places where callers need to match on the failure.
//! Everything else propagates `anyhow::Error` with context.

use thiserror::Error;

/// Fetch or parse failure of a single feed source.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The source needs a client that was not configured (e.g. no search API key).
    #[error("source not configured: {0}")]
    NotConfigured(&'static str),

    /// Upstream answered with a non-2xx status.
    #[error("upstream status {status} for {url}")]
    Status { status: u16, url: String },

    /// Document is not RSS 2.0, RSS 1.0 (RDF) or Atom.
    #[error("unsupported feed format: {0}")]
    UnsupportedFormat(String),
}

/// Snapshot validation and persistence errors.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("admin token not configured")]
    TokenNotConfigured,

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),

    /// Remote publish endpoint refused the snapshot.
    #[error("publish failed (status {status}): {body}")]
    Remote { status: u16, body: String },
}

impl PublishError {
    /// HTTP status a handler should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::TokenNotConfigured | Self::Unauthorized => 401,
            Self::InvalidPayload(_) => 400,
            Self::Io(_) | Self::Json(_) | Self::Remote { .. } => 500,
        }
    }
}
