//! Item scoring.
//!
//! score = w_source   * source_weight(domain)        (reputation, [0,1])
//!       + w_recency  * recency(age)                 (1 at age 0 → 0 at the horizon)
//!       + w_keyword  * min(notable_hits, cap)
//!       + w_external * relevance                    (search-API score, [0,1])
//!
//! Pure and total: the same item and `now` always give the same finite number.

use chrono::{DateTime, Utc};

use crate::config::pipeline::ScoringWeights;
use crate::config::PipelineRules;
use crate::feed::FeedItem;
use crate::source_weights::SourceWeightsConfig;
use crate::text;

/// Linear decay from 1.0 (now) to 0.0 at `horizon_hours`. Unknown timestamps score 0;
/// timestamps in the future count as brand new.
pub fn recency(ts_ms: i64, now: DateTime<Utc>, horizon_hours: f64) -> f64 {
    if ts_ms <= 0 || !horizon_hours.is_finite() || horizon_hours <= 0.0 {
        return 0.0;
    }
    let age_hours = ((now.timestamp_millis() - ts_ms) as f64 / 3_600_000.0).max(0.0);
    (1.0 - age_hours / horizon_hours).clamp(0.0, 1.0)
}

/// Number of distinct notable patterns hit by the item.
pub fn notable_hits(rules: &PipelineRules, item: &FeedItem) -> usize {
    let hay = item.haystack();
    rules.notable.iter().filter(|re| re.is_match(&hay)).count()
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

pub fn score_parts(
    w: &ScoringWeights,
    source_weight: f64,
    recency: f64,
    hits: usize,
    relevance: Option<f64>,
) -> f64 {
    let source = finite_or_zero(source_weight).clamp(0.0, 1.0) * finite_or_zero(w.source);
    let fresh = finite_or_zero(recency).clamp(0.0, 1.0) * finite_or_zero(w.recency);
    let kw = hits.min(w.keyword_cap) as f64 * finite_or_zero(w.keyword);
    let ext = relevance.map(finite_or_zero).unwrap_or(0.0).clamp(0.0, 1.0) * finite_or_zero(w.external);
    finite_or_zero(source + fresh + kw + ext)
}

/// Score one item.
pub fn score(
    rules: &PipelineRules,
    weights: &SourceWeightsConfig,
    item: &FeedItem,
    now: DateTime<Utc>,
) -> f64 {
    let domain = text::domain(&item.link);
    let sw = weights.weight_for_item(&domain, &item.source) as f64;
    let rec = recency(item.ts, now, rules.scoring.recency_horizon_hours);
    score_parts(&rules.scoring, sw, rec, notable_hits(rules, item), item.relevance)
}

/// Score every item in place and sort score-descending (stable; ties keep feed order).
pub fn score_and_sort(
    rules: &PipelineRules,
    weights: &SourceWeightsConfig,
    items: &mut [FeedItem],
    now: DateTime<Utc>,
) {
    for it in items.iter_mut() {
        it.score = score(rules, weights, it, now);
    }
    sort_by_score_desc(items);
}

pub fn sort_by_score_desc(items: &mut [FeedItem]) {
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
}
