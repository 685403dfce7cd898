// src/classify.rs
//! Topic tagging and exclusion filters driven by the compiled pipeline rules.

use metrics::counter;
use tracing::debug;

use crate::config::PipelineRules;
use crate::feed::FeedItem;
use crate::text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    Politics,
    PoliticsDomain,
    Geography,
    OutOfScope,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Politics => "politics",
            Self::PoliticsDomain => "politics_domain",
            Self::Geography => "geography",
            Self::OutOfScope => "out_of_scope",
        }
    }
}

/// First topic in precedence order whose pattern matches; the default topic otherwise.
pub fn classify_topic(rules: &PipelineRules, item: &FeedItem) -> String {
    let hay = item.haystack();
    rules
        .topics
        .iter()
        .find(|t| t.re.is_match(&hay))
        .map(|t| t.id.clone())
        .unwrap_or_else(|| rules.default_topic.clone())
}

/// Exact or parent-domain match (`news.nature.com` matches `nature.com`).
pub fn domain_in_list(domain: &str, list: &[String]) -> bool {
    let d = domain.to_ascii_lowercase();
    list.iter()
        .any(|w| d == *w || d.ends_with(&format!(".{w}")))
}

pub fn is_whitelisted_domain(rules: &PipelineRules, domain: &str) -> bool {
    domain_in_list(domain, &rules.whitelist_domains)
}

/// Why an item must be dropped, if at all. Politics and geography apply everywhere;
/// the in-scope requirement only when asked for and never to whitelisted domains.
pub fn exclusion(rules: &PipelineRules, item: &FeedItem, require_in_scope: bool) -> Option<DropReason> {
    let hay = item.haystack();
    let domain = text::domain(&item.link);

    if rules.politics.iter().any(|re| re.is_match(&hay)) {
        return Some(DropReason::Politics);
    }
    if domain_in_list(&domain, &rules.politics_domains) {
        return Some(DropReason::PoliticsDomain);
    }
    if rules.geography.iter().any(|re| re.is_match(&hay)) {
        return Some(DropReason::Geography);
    }
    if require_in_scope
        && !is_whitelisted_domain(rules, &domain)
        && !rules.in_scope.iter().any(|re| re.is_match(&hay))
    {
        return Some(DropReason::OutOfScope);
    }
    None
}

/// Drop excluded items and tag the survivors with their topic. Order is preserved.
pub fn filter_and_tag(
    rules: &PipelineRules,
    items: Vec<FeedItem>,
    require_in_scope: bool,
) -> Vec<FeedItem> {
    let mut kept = Vec::with_capacity(items.len());
    for mut item in items {
        if let Some(reason) = exclusion(rules, &item, require_in_scope) {
            debug!(target: "pipeline", reason = reason.as_str(), title = %item.title, "item dropped");
            counter!("pipeline_dropped_total", "reason" => reason.as_str()).increment(1);
            continue;
        }
        item.topic = classify_topic(rules, &item);
        kept.push(item);
    }
    kept
}
