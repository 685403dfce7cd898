// src/config/mod.rs
//! Environment-driven runtime configuration plus the file-backed rule sets.

pub mod categories;
pub mod pipeline;

use std::path::PathBuf;
use std::time::Duration;

pub use categories::{CategoryConfig, FeedSource};
pub use pipeline::PipelineRules;

pub const DEFAULT_BASE_URL: &str = "https://newsintel.noetex.ai";
pub const DEFAULT_DIGEST_FILE: &str = "data/home-latest.json";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 15 * 60;
pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Process configuration read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    /// Snapshot read by the server and written by `publish-home`.
    pub digest_file: PathBuf,
    pub admin_token: Option<String>,
    pub cache_ttl: Duration,
    pub feed_timeout: Duration,
    pub enrich_enabled: bool,
    pub llm: Option<LlmConfig>,
    pub search: Option<SearchConfig>,
    pub translate_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_url: String,
    pub api_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            digest_file: PathBuf::from(DEFAULT_DIGEST_FILE),
            admin_token: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            feed_timeout: Duration::from_secs(DEFAULT_FEED_TIMEOUT_SECS),
            enrich_enabled: false,
            llm: None,
            search: None,
            translate_url: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let llm = non_empty_env("LLM_API_KEY")
            .or_else(|| non_empty_env("OPENAI_API_KEY"))
            .map(|api_key| LlmConfig {
                api_url: non_empty_env("LLM_API_URL")
                    .unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
                api_key,
                model: non_empty_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            });

        let search = match (non_empty_env("SEARCH_API_URL"), non_empty_env("SEARCH_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(SearchConfig { api_url, api_key }),
            _ => None,
        };

        let digest_file = non_empty_env("HOME_DIGEST_FILE")
            .or_else(|| non_empty_env("HOME_DIGEST_OUT"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIGEST_FILE));

        Self {
            base_url: non_empty_env("WEBAPP_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            digest_file,
            admin_token: non_empty_env("ADMIN_PUBLISH_TOKEN"),
            cache_ttl: Duration::from_secs(
                parse_u64_env("CACHE_TTL_SECS").unwrap_or(DEFAULT_CACHE_TTL_SECS),
            ),
            feed_timeout: Duration::from_secs(
                parse_u64_env("FEED_TIMEOUT_SECS").unwrap_or(DEFAULT_FEED_TIMEOUT_SECS),
            ),
            // Enrichment defaults to on whenever an LLM key is configured.
            enrich_enabled: flag_env("ENRICH_ENABLED").unwrap_or(llm.is_some()),
            llm,
            search,
            translate_url: non_empty_env("TRANSLATE_API_URL"),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_u64_env(key: &str) -> Option<u64> {
    non_empty_env(key).and_then(|v| v.parse().ok())
}

fn flag_env(key: &str) -> Option<bool> {
    non_empty_env(key).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[serial_test::serial]
    #[test]
    fn from_env_reads_overrides_and_defaults() {
        for k in [
            "WEBAPP_BASE_URL",
            "HOME_DIGEST_FILE",
            "HOME_DIGEST_OUT",
            "ADMIN_PUBLISH_TOKEN",
            "CACHE_TTL_SECS",
            "LLM_API_KEY",
            "OPENAI_API_KEY",
            "ENRICH_ENABLED",
            "SEARCH_API_URL",
            "SEARCH_API_KEY",
        ] {
            env::remove_var(k);
        }

        let d = AppConfig::from_env();
        assert_eq!(d.base_url, DEFAULT_BASE_URL);
        assert!(d.llm.is_none());
        assert!(!d.enrich_enabled);
        assert_eq!(d.cache_ttl, Duration::from_secs(DEFAULT_CACHE_TTL_SECS));

        env::set_var("WEBAPP_BASE_URL", "http://localhost:4321/");
        env::set_var("CACHE_TTL_SECS", "5");
        env::set_var("LLM_API_KEY", "k");
        env::set_var("ADMIN_PUBLISH_TOKEN", "  ");
        let c = AppConfig::from_env();
        assert_eq!(c.base_url, "http://localhost:4321");
        assert_eq!(c.cache_ttl, Duration::from_secs(5));
        assert!(c.enrich_enabled);
        assert_eq!(c.llm.as_ref().map(|l| l.model.as_str()), Some(DEFAULT_LLM_MODEL));
        assert!(c.admin_token.is_none(), "blank token counts as unset");

        for k in ["WEBAPP_BASE_URL", "CACHE_TTL_SECS", "LLM_API_KEY", "ADMIN_PUBLISH_TOKEN"] {
            env::remove_var(k);
        }
    }
}
