// src/rank.rs
//! Selection steps over score-sorted items: dedupe, per-source cap, topic quota rebalance.

use std::collections::{HashMap, HashSet};

use crate::feed::FeedItem;
use crate::scoring::sort_by_score_desc;
use crate::text;

/// Normalized dedupe key: lowercase `link::title` (title cleaned).
pub fn dedupe_key(item: &FeedItem) -> String {
    format!("{}::{}", item.link.trim(), text::clean(&item.title)).to_lowercase()
}

/// Key on what the page shows: the translated title when present.
pub fn display_dedupe_key(item: &FeedItem) -> String {
    format!("{}::{}", item.link.trim(), text::clean(item.display_title())).to_lowercase()
}

/// Keep the first occurrence of every key, preserving order.
pub fn dedupe_by<F>(items: Vec<FeedItem>, key: F) -> Vec<FeedItem>
where
    F: Fn(&FeedItem) -> String,
{
    let mut seen = HashSet::with_capacity(items.len());
    items.into_iter().filter(|it| seen.insert(key(it))).collect()
}

pub fn dedupe(items: Vec<FeedItem>) -> Vec<FeedItem> {
    dedupe_by(items, dedupe_key)
}

/// Dedupe across lists with one shared `seen` set: an item survives only in the
/// first list (in iteration order) that contains it.
pub fn dedupe_across<F>(lists: &mut [Vec<FeedItem>], key: F)
where
    F: Fn(&FeedItem) -> String,
{
    let mut seen = HashSet::new();
    for list in lists.iter_mut() {
        list.retain(|it| seen.insert(key(it)));
    }
}

/// Walk a score-sorted list and accept an item only while its source has fewer than
/// `cap` accepted items. Stops at `limit`.
pub fn select_with_source_cap(items: &[FeedItem], cap: usize, limit: usize) -> Vec<FeedItem> {
    let mut per_source: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(limit.min(items.len()));
    for it in items {
        if out.len() >= limit {
            break;
        }
        let n = per_source.entry(text::source_key(&it.source)).or_insert(0);
        if *n >= cap {
            continue;
        }
        *n += 1;
        out.push(it.clone());
    }
    out
}

/// Topic-diverse selection.
///
/// 1. Bucket by topic (score order kept inside buckets).
/// 2. For each topic in `topic_order`, take up to `per_topic`, skipping dedupe-key collisions.
/// 3. If still short of `target`, fill from the whole score-sorted list.
///
/// Output is truncated to `target` and returned score-descending.
pub fn rebalance(
    items: &[FeedItem],
    topic_order: &[&str],
    per_topic: usize,
    target: usize,
) -> Vec<FeedItem> {
    let mut sorted: Vec<&FeedItem> = items.iter().collect();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut buckets: HashMap<&str, Vec<&FeedItem>> = HashMap::new();
    for it in &sorted {
        buckets.entry(it.topic.as_str()).or_default().push(it);
    }

    let mut picked: Vec<FeedItem> = Vec::with_capacity(target);
    let mut keys: HashSet<String> = HashSet::new();

    'topics: for topic in topic_order {
        let Some(bucket) = buckets.get(topic) else {
            continue;
        };
        let mut taken = 0;
        for it in bucket {
            if taken >= per_topic {
                break;
            }
            if picked.len() >= target {
                break 'topics;
            }
            if keys.insert(dedupe_key(it)) {
                picked.push((*it).clone());
                taken += 1;
            }
        }
    }

    if picked.len() < target {
        for it in &sorted {
            if picked.len() >= target {
                break;
            }
            if keys.insert(dedupe_key(it)) {
                picked.push((*it).clone());
            }
        }
    }

    picked.truncate(target);
    sort_by_score_desc(&mut picked);
    picked
}
