// src/config/pipeline.rs
//! Pipeline rules: topic patterns + precedence, exclusion filters, scoring weights
//! and selection quotas. Loaded from TOML and compiled once.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";

/// Compiled-in copy of `config/pipeline.toml`, used when no file is present.
const BUILTIN_PIPELINE_TOML: &str = include_str!("../../config/pipeline.toml");

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineRoot {
    #[serde(default)]
    pub selection: SelectionCfg,
    #[serde(default)]
    pub scoring: ScoringWeights,
    pub topics: TopicsCfg,
    #[serde(default)]
    pub filters: FiltersCfg,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SelectionCfg {
    pub per_source_cap: usize,
    pub per_topic_quota: usize,
    #[serde(default = "default_pool_multiplier")]
    pub pool_multiplier: usize,
}

fn default_pool_multiplier() -> usize {
    3
}

impl Default for SelectionCfg {
    fn default() -> Self {
        Self {
            per_source_cap: 3,
            per_topic_quota: 3,
            pool_multiplier: default_pool_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScoringWeights {
    pub source: f64,
    pub recency: f64,
    #[serde(default = "default_horizon")]
    pub recency_horizon_hours: f64,
    pub keyword: f64,
    #[serde(default = "default_keyword_cap")]
    pub keyword_cap: usize,
    pub external: f64,
}

fn default_horizon() -> f64 {
    72.0
}

fn default_keyword_cap() -> usize {
    3
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            source: 10.0,
            recency: 4.0,
            recency_horizon_hours: default_horizon(),
            keyword: 1.5,
            keyword_cap: default_keyword_cap(),
            external: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicsCfg {
    pub precedence: Vec<String>,
    pub default: String,
    #[serde(default)]
    pub rules: Vec<TopicRuleCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicRuleCfg {
    pub id: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FiltersCfg {
    #[serde(default)]
    pub politics_keywords: Vec<String>,
    #[serde(default)]
    pub politics_domains: Vec<String>,
    #[serde(default)]
    pub geography_patterns: Vec<String>,
    #[serde(default)]
    pub in_scope_keywords: Vec<String>,
    #[serde(default)]
    pub whitelist_domains: Vec<String>,
    #[serde(default)]
    pub notable_keywords: Vec<String>,
}

/* ----------------------------
Compiled rules
---------------------------- */

#[derive(Debug)]
pub struct TopicRule {
    pub id: String,
    pub re: Regex,
}

#[derive(Debug)]
pub struct PipelineRules {
    pub selection: SelectionCfg,
    pub scoring: ScoringWeights,
    /// Topic rules ordered by precedence (first match wins).
    pub topics: Vec<TopicRule>,
    pub default_topic: String,
    pub politics: Vec<Regex>,
    pub politics_domains: Vec<String>,
    pub geography: Vec<Regex>,
    pub in_scope: Vec<Regex>,
    pub whitelist_domains: Vec<String>,
    pub notable: Vec<Regex>,
}

impl PipelineRules {
    /// Load from `$PIPELINE_CONFIG_PATH`, then `config/pipeline.toml`, then the built-in copy.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PIPELINE_CONFIG_PATH) {
            let path = PathBuf::from(p);
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading pipeline rules from {}", path.display()))?;
            return Self::from_toml_str(&content);
        }
        let path = PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH);
        match fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(_) => Self::builtin(),
        }
    }

    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_PIPELINE_TOML)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let cfg: PipelineRoot = toml::from_str(toml_str).context("parsing pipeline toml")?;
        Self::compile(cfg)
    }

    pub fn compile(cfg: PipelineRoot) -> Result<Self> {
        if cfg.topics.precedence.is_empty() {
            return Err(anyhow!("topics.precedence must not be empty"));
        }
        if !cfg.topics.precedence.contains(&cfg.topics.default) {
            return Err(anyhow!(
                "default topic `{}` missing from topics.precedence",
                cfg.topics.default
            ));
        }

        // Order topic rules by precedence; every precedence entry needs a rule.
        let mut topics = Vec::with_capacity(cfg.topics.precedence.len());
        for id in &cfg.topics.precedence {
            let rule = cfg
                .topics
                .rules
                .iter()
                .find(|r| &r.id == id)
                .ok_or_else(|| anyhow!("topic `{id}` listed in precedence has no rule"))?;
            let re = Regex::new(&rule.pattern)
                .map_err(|e| anyhow!("topic `{}` regex error: {}", rule.id, e))?;
            topics.push(TopicRule { id: id.clone(), re });
        }

        let f = cfg.filters;
        Ok(Self {
            selection: cfg.selection,
            scoring: cfg.scoring,
            topics,
            default_topic: cfg.topics.default,
            politics: compile_list("politics_keywords", &f.politics_keywords)?,
            politics_domains: lower_list(f.politics_domains),
            geography: compile_list("geography_patterns", &f.geography_patterns)?,
            in_scope: compile_list("in_scope_keywords", &f.in_scope_keywords)?,
            whitelist_domains: lower_list(f.whitelist_domains),
            notable: compile_list("notable_keywords", &f.notable_keywords)?,
        })
    }

    /// Topic ids in priority order.
    pub fn topic_order(&self) -> Vec<&str> {
        self.topics.iter().map(|t| t.id.as_str()).collect()
    }
}

fn compile_list(name: &str, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .enumerate()
        .map(|(i, p)| Regex::new(p).map_err(|e| anyhow!("{name}[{i}] regex error: {e}")))
        .collect()
}

fn lower_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINI: &str = r#"
[topics]
precedence = ["neuro", "ai"]
default = "ai"

[[topics.rules]]
id = "neuro"
pattern = "(?i)\\bbrain\\b"

[[topics.rules]]
id = "ai"
pattern = "(?i)\\bai\\b"
"#;

    #[test]
    fn builtin_rules_compile() {
        let r = PipelineRules::builtin().expect("builtin compiles");
        assert_eq!(r.topic_order().last().copied(), Some("ai"));
        assert!(!r.politics.is_empty());
        assert!(r.selection.per_source_cap > 0);
    }

    #[test]
    fn mini_config_uses_defaults_for_missing_sections() {
        let r = PipelineRules::from_toml_str(MINI).unwrap();
        assert_eq!(r.topic_order(), vec!["neuro", "ai"]);
        assert_eq!(r.selection.per_topic_quota, 3);
        assert!(r.politics.is_empty());
    }

    #[test]
    fn precedence_without_rule_is_rejected() {
        let bad = MINI.replace(r#"["neuro", "ai"]"#, r#"["neuro", "life", "ai"]"#);
        let err = PipelineRules::from_toml_str(&bad).unwrap_err();
        assert!(err.to_string().contains("life"));
    }

    #[test]
    fn bad_regex_names_the_rule() {
        let bad = MINI.replace(r"(?i)\\bbrain\\b", "(unclosed");
        let err = PipelineRules::from_toml_str(&bad).unwrap_err();
        assert!(err.to_string().contains("neuro"), "{err}");
    }
}
