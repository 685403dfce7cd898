//! # Source Weights
//!
//! Static reputation table mapping publication domains (e.g. `nature.com`,
//! `arxiv.org`) and source labels to weights in `[0.0, 1.0]`.
//!
//! - Loads from JSON config (weights + aliases).
//! - Case-insensitive lookup; `www.` and URL noise are stripped.
//! - Aliases map alternative domains or labels to a canonical key.
//! - Fallback order: aliases → exact match → parent domain → substring → default.
//! - Includes a built-in `default_seed()` with common AI/science outlets.

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

pub const DEFAULT_SOURCE_WEIGHTS_PATH: &str = "config/source_weights.json";

/// Configuration for source weights, loaded from JSON or defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceWeightsConfig {
    /// Default weight if no match is found.
    #[serde(default = "default_default_weight")]
    pub default_weight: f32,
    /// Explicit weights for canonical keys (domains or labels).
    #[serde(default)]
    pub weights: HashMap<String, f32>,
    /// Aliases mapping non-canonical names → canonical keys.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

fn default_default_weight() -> f32 {
    0.50
}

impl SourceWeightsConfig {
    /// Load configuration from a JSON file.
    /// Falls back to `default_seed()` on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str::<Self>(&s)
                .map(Self::normalized)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "invalid source weights json, using seed");
                    Self::default_seed()
                }),
            Err(_) => Self::default_seed(),
        }
    }

    fn normalized(self) -> Self {
        Self {
            default_weight: self.default_weight,
            weights: self
                .weights
                .into_iter()
                .map(|(k, v)| (normalize(&k), v))
                .collect(),
            aliases: self
                .aliases
                .into_iter()
                .map(|(k, v)| (normalize(&k), normalize(&v)))
                .collect(),
        }
    }

    /// Weight for a domain or a source label.
    ///
    /// Steps:
    /// 1. Alias lookup → canonical → weight.
    /// 2. Exact weight match.
    /// 3. Parent domains (`news.mit.edu` → `mit.edu`).
    /// 4. Substring fallback for labels (e.g. "arXiv cs.AI" → "arxiv").
    /// 5. Default weight.
    pub fn weight_for(&self, key: &str) -> f32 {
        let s = normalize(key);

        if let Some(canon) = self.aliases.get(&s) {
            if let Some(&w) = self.weights.get(canon) {
                return clamp01(w);
            }
        }

        if let Some(&w) = self.weights.get(&s) {
            return clamp01(w);
        }

        let mut rest = s.as_str();
        while let Some((_, parent)) = rest.split_once('.') {
            if !parent.contains('.') {
                break;
            }
            if let Some(&w) = self.weights.get(parent) {
                return clamp01(w);
            }
            rest = parent;
        }

        // Longest key wins so "technologyreview" beats a shorter accidental hit;
        // equal lengths resolve to the lexicographically smaller key.
        let mut best: Option<(&str, f32)> = None;
        for (k, &w) in &self.weights {
            let stem = registrable_stem(k);
            if stem.len() >= 4
                && s.contains(stem)
                && best.map_or(true, |(bk, _)| {
                    k.len() > bk.len() || (k.len() == bk.len() && k.as_str() < bk)
                })
            {
                best = Some((k.as_str(), w));
            }
        }
        if let Some((_, w)) = best {
            return clamp01(w);
        }

        clamp01(self.default_weight)
    }

    /// Weight of an item: its link's domain first, its source label as a fallback.
    pub fn weight_for_item(&self, domain: &str, source: &str) -> f32 {
        let by_domain = self.weight_for(domain);
        if (by_domain - clamp01(self.default_weight)).abs() > f32::EPSILON {
            return by_domain;
        }
        self.weight_for(source)
    }

    /// Built-in seed with common AI/science outlets.
    /// Used as fallback if no config is found.
    pub fn default_seed() -> Self {
        let mut weights = HashMap::new();
        let mut aliases = HashMap::new();

        for (k, v) in [
            ("nature.com", 0.98),
            ("science.org", 0.97),
            ("cell.com", 0.95),
            ("pnas.org", 0.93),
            ("arxiv.org", 0.85),
            ("biorxiv.org", 0.80),
            ("technologyreview.com", 0.90),
            ("quantamagazine.org", 0.92),
            ("neurosciencenews.com", 0.78),
            ("medicalxpress.com", 0.72),
            ("sciencedaily.com", 0.75),
            ("venturebeat.com", 0.70),
            ("theverge.com", 0.72),
            ("wired.com", 0.75),
            ("arstechnica.com", 0.76),
            ("reuters.com", 0.85),
            ("ft.com", 0.85),
            ("deepmind.google", 0.90),
            ("openai.com", 0.88),
            ("anthropic.com", 0.88),
            ("worksinprogress.news", 0.74),
            ("news.ycombinator.com", 0.62),
            ("lobste.rs", 0.60),
            ("scour.ing", 0.55),
        ] {
            weights.insert(k.to_string(), v);
        }

        for (a, c) in [
            ("sciencemag.org", "science.org"),
            ("export.arxiv.org", "arxiv.org"),
            ("hnrss.org", "news.ycombinator.com"),
            ("hacker news", "news.ycombinator.com"),
            ("mit technology review", "technologyreview.com"),
            ("the verge", "theverge.com"),
            ("neuroscience news", "neurosciencenews.com"),
            ("medical xpress", "medicalxpress.com"),
            ("deepmind.com", "deepmind.google"),
        ] {
            aliases.insert(a.to_string(), c.to_string());
        }

        Self {
            default_weight: default_default_weight(),
            weights,
            aliases,
        }
    }
}

/// Lowercase, strip scheme/`www.`/path, collapse whitespace.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_lowercase();
    for prefix in ["https://", "http://"] {
        if let Some(rest) = out.strip_prefix(prefix) {
            out = rest.split('/').next().unwrap_or_default().to_string();
        }
    }
    if let Some(rest) = out.strip_prefix("www.") {
        out = rest.to_string();
    }
    for ch in ['—', '–', '_', '\n', '\r', '\t'] {
        out = out.replace(ch, " ");
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `news.ycombinator.com` → `ycombinator`; labels without dots are returned as-is.
fn registrable_stem(key: &str) -> &str {
    let mut parts = key.rsplit('.');
    match (parts.next(), parts.next()) {
        (Some(_tld), Some(name)) => name,
        _ => key,
    }
}

/// Clamp to [0.0, 1.0].
fn clamp01(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
