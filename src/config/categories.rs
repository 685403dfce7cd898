// src/config/categories.rs
//! Static category definitions (feed sources, limits, display names).

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CATEGORIES_CONFIG_PATH: &str = "config/categories.toml";
pub const ENV_CATEGORIES_CONFIG_PATH: &str = "CATEGORIES_CONFIG_PATH";

/// The consciousness research category is served on its own route, outside the home digest.
pub const CONSCIOUSNESS_CATEGORY_ID: &str = "consciousness";

/// One upstream of a category: an RSS/Atom feed or a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeedSource {
    Rss { url: String, source: String },
    Search { query: String, source: String },
}

impl FeedSource {
    pub fn rss(url: &str, source: &str) -> Self {
        Self::Rss {
            url: url.to_string(),
            source: source.to_string(),
        }
    }

    pub fn search(query: &str, source: &str) -> Self {
        Self::Search {
            query: query.to_string(),
            source: source.to_string(),
        }
    }

    /// Display label used for items and error placeholders.
    pub fn label(&self) -> &str {
        match self {
            Self::Rss { source, .. } | Self::Search { source, .. } => source,
        }
    }

    /// Link recorded on the error placeholder for this source.
    pub fn locator(&self) -> &str {
        match self {
            Self::Rss { url, .. } => url,
            Self::Search { query, .. } => query,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub id: String,
    pub name: String,
    pub zh_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub zh_description: String,
    pub limit: usize,
    /// Part of the rendered home page / home digest.
    #[serde(default = "default_true")]
    pub home: bool,
    /// Drop items that hit none of the in-scope keywords.
    #[serde(default)]
    pub require_in_scope: bool,
    pub feeds: Vec<FeedSource>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct CategoriesFile {
    #[serde(rename = "category")]
    categories: Vec<CategoryConfig>,
}

/// Load categories using env var + fallbacks:
/// 1) $CATEGORIES_CONFIG_PATH
/// 2) config/categories.toml
/// 3) built-in defaults
pub fn load_categories_default() -> Result<Vec<CategoryConfig>> {
    if let Ok(p) = std::env::var(ENV_CATEGORIES_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("CATEGORIES_CONFIG_PATH points to non-existent path"));
        }
        return load_categories_from(&pb);
    }
    let p = PathBuf::from(DEFAULT_CATEGORIES_CONFIG_PATH);
    if p.exists() {
        return load_categories_from(&p);
    }
    Ok(builtin_categories())
}

pub fn load_categories_from(path: &Path) -> Result<Vec<CategoryConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading categories from {}", path.display()))?;
    parse_categories(&content)
}

pub fn parse_categories(s: &str) -> Result<Vec<CategoryConfig>> {
    let file: CategoriesFile = toml::from_str(s).context("parsing categories toml")?;
    validate(&file.categories)?;
    Ok(file.categories)
}

fn validate(categories: &[CategoryConfig]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for c in categories {
        if c.id.trim().is_empty() {
            return Err(anyhow!("category with empty id"));
        }
        if !seen.insert(c.id.as_str()) {
            return Err(anyhow!("duplicate category id `{}`", c.id));
        }
        if c.limit == 0 {
            return Err(anyhow!("category `{}` has limit 0", c.id));
        }
    }
    Ok(())
}

/// Built-in category list. The Scour feed URL can be overridden with `SCOUR_RSS`.
pub fn builtin_categories() -> Vec<CategoryConfig> {
    let scour = std::env::var("SCOUR_RSS")
        .unwrap_or_else(|_| "https://scour.ing/@yuesean/rss.xml".to_string());

    vec![
        CategoryConfig {
            id: "scour".into(),
            name: "Scour Feeds".into(),
            zh_name: "Scour 信息流".into(),
            description: "Your personal Scour stream and recommended links".into(),
            zh_description: "你的 Scour 个性化信息流与推荐源".into(),
            limit: 12,
            home: true,
            require_in_scope: false,
            feeds: vec![FeedSource::rss(&scour, "scour.ing")],
        },
        CategoryConfig {
            id: "arxiv".into(),
            name: "Arxiv Digest".into(),
            zh_name: "Arxiv 论文速览".into(),
            description: "Fresh papers from AI / neuroscience-related categories".into(),
            zh_description: "聚合 AI 与神经科学相关新论文".into(),
            limit: 15,
            home: true,
            require_in_scope: false,
            feeds: vec![
                FeedSource::rss("https://export.arxiv.org/rss/cs.AI", "arXiv cs.AI"),
                FeedSource::rss("https://export.arxiv.org/rss/cs.CL", "arXiv cs.CL"),
                FeedSource::rss("https://export.arxiv.org/rss/q-bio.NC", "arXiv q-bio.NC"),
            ],
        },
        CategoryConfig {
            id: "media".into(),
            name: "Media Headlines".into(),
            zh_name: "媒体头条".into(),
            description: "Top media coverage around AI and tech".into(),
            zh_description: "AI 与科技领域的媒体重点报道".into(),
            limit: 15,
            home: true,
            require_in_scope: true,
            feeds: vec![
                FeedSource::rss("https://venturebeat.com/category/ai/feed/", "VentureBeat"),
                FeedSource::rss(
                    "https://www.theverge.com/rss/ai-artificial-intelligence/index.xml",
                    "The Verge",
                ),
                FeedSource::rss(
                    "https://www.technologyreview.com/topic/artificial-intelligence/feed/",
                    "MIT Technology Review",
                ),
                FeedSource::search("artificial intelligence news this week", "Web Search"),
            ],
        },
        CategoryConfig {
            id: "research".into(),
            name: "Research Alert".into(),
            zh_name: "研究快讯".into(),
            description: "Research-heavy news and scientific updates".into(),
            zh_description: "科研导向的新闻与学术更新".into(),
            limit: 15,
            home: true,
            require_in_scope: true,
            feeds: vec![
                FeedSource::rss("https://neurosciencenews.com/feed/", "Neuroscience News"),
                FeedSource::rss("https://medicalxpress.com/rss-feed/", "Medical Xpress"),
                FeedSource::rss(
                    "https://www.sciencedaily.com/rss/computers_math/artificial_intelligence.xml",
                    "ScienceDaily",
                ),
            ],
        },
        CategoryConfig {
            id: "trends".into(),
            name: "Tech Trends".into(),
            zh_name: "技术趋势".into(),
            description: "High-signal discussions and trend posts".into(),
            zh_description: "高信号讨论与趋势型内容".into(),
            limit: 15,
            home: true,
            require_in_scope: true,
            feeds: vec![
                FeedSource::rss("https://hnrss.org/newest?q=AI", "Hacker News"),
                FeedSource::rss("https://lobste.rs/t/ai.rss", "Lobsters"),
                FeedSource::rss("https://www.worksinprogress.news/feed", "Works in Progress"),
            ],
        },
        CategoryConfig {
            id: CONSCIOUSNESS_CATEGORY_ID.into(),
            name: "Consciousness Research".into(),
            zh_name: "意识研究".into(),
            description: "Consciousness science, theories of mind and machine consciousness"
                .into(),
            zh_description: "意识科学、心智理论与机器意识".into(),
            limit: 12,
            home: false,
            require_in_scope: true,
            feeds: vec![
                FeedSource::rss("https://neurosciencenews.com/tag/consciousness/feed/", "Neuroscience News"),
                FeedSource::rss("https://export.arxiv.org/rss/q-bio.NC", "arXiv q-bio.NC"),
                FeedSource::search("consciousness research neuroscience", "Web Search"),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_are_unique_and_valid() {
        let cats = builtin_categories();
        validate(&cats).expect("builtin categories valid");
        assert!(cats.iter().any(|c| c.id == CONSCIOUSNESS_CATEGORY_ID && !c.home));
    }

    #[test]
    fn parses_tagged_sources() {
        let s = r#"
[[category]]
id = "x"
name = "X"
zh_name = "叉"
limit = 5
feeds = [
  { kind = "rss", url = "https://a.example/feed", source = "A" },
  { kind = "search", query = "brains", source = "Search" },
]
"#;
        let cats = parse_categories(s).unwrap();
        assert_eq!(cats.len(), 1);
        assert!(cats[0].home);
        assert!(!cats[0].require_in_scope);
        assert_eq!(cats[0].feeds[1], FeedSource::search("brains", "Search"));
        assert_eq!(cats[0].feeds[0].label(), "A");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let s = r#"
[[category]]
id = "x"
name = "X"
zh_name = "叉"
limit = 5
feeds = []

[[category]]
id = "x"
name = "Y"
zh_name = "叉"
limit = 5
feeds = []
"#;
        assert!(parse_categories(s).is_err());
    }
}
