// src/enrich/cache.rs
//! In-memory memo for title translations and summaries. Shared via `Arc`, cleared on forced refresh.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use sha2::{Digest, Sha256};

use crate::text;

#[derive(Debug, Default)]
pub struct EnrichCache {
    titles: RwLock<HashMap<String, String>>,
    summaries: RwLock<HashMap<String, String>>,
}

impl EnrichCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self, title: &str) -> Option<String> {
        let g = self.titles.read().unwrap_or_else(PoisonError::into_inner);
        g.get(&title_key(title)).cloned()
    }

    pub fn put_title(&self, title: &str, zh: &str) {
        let mut g = self.titles.write().unwrap_or_else(PoisonError::into_inner);
        g.insert(title_key(title), zh.to_string());
    }

    pub fn summary(&self, title: &str, source_text: &str) -> Option<String> {
        let g = self.summaries.read().unwrap_or_else(PoisonError::into_inner);
        g.get(&summary_key(title, source_text)).cloned()
    }

    pub fn put_summary(&self, title: &str, source_text: &str, summary: &str) {
        let mut g = self.summaries.write().unwrap_or_else(PoisonError::into_inner);
        g.insert(summary_key(title, source_text), summary.to_string());
    }

    /// (titles, summaries)
    pub fn len(&self) -> (usize, usize) {
        let t = self.titles.read().unwrap_or_else(PoisonError::into_inner).len();
        let s = self.summaries.read().unwrap_or_else(PoisonError::into_inner).len();
        (t, s)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == (0, 0)
    }

    pub fn clear(&self) {
        self.titles.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.summaries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

fn title_key(title: &str) -> String {
    text::clean(title).to_lowercase()
}

/// Hex SHA-256 of `title \n text`.
fn summary_key(title: &str, source_text: &str) -> String {
    let mut h = Sha256::new();
    h.update(text::clean(title).as_bytes());
    h.update(b"\n");
    h.update(source_text.trim().as_bytes());
    h.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_clears() {
        let c = EnrichCache::new();
        assert!(c.is_empty());
        c.put_title("Robot  learns", "机器人学习");
        c.put_summary("t", "body", "摘要");
        assert_eq!(c.title("robot learns").as_deref(), Some("机器人学习"));
        assert_eq!(c.summary("t", " body ").as_deref(), Some("摘要"));
        assert_eq!(c.summary("t", "other"), None);
        assert_eq!(c.len(), (1, 1));
        c.clear();
        assert!(c.is_empty());
        assert_eq!(c.title("Robot learns"), None);
    }

    #[test]
    fn summary_key_is_stable_hex() {
        let k = summary_key("a", "b");
        assert_eq!(k.len(), 64);
        assert_eq!(k, summary_key("a", "b"));
        assert_ne!(k, summary_key("a", "c"));
    }
}
