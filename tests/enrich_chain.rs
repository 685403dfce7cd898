// tests/enrich_chain.rs
//
// Enrichment fallback chains end to end with a scripted LLM and a fake page fetcher:
// boilerplate summaries trigger page extraction, rejected model output escalates to
// the alternate prompt, accepted results are cached, and a forced category refresh
// clears the caches.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use news_intel_digest::config::{CategoryConfig, FeedSource, PipelineRules};
use news_intel_digest::enrich::extract::PageFetcher;
use news_intel_digest::enrich::llm::MockProvider;
use news_intel_digest::enrich::translate::{self, EndpointFuture, TitleStage, TranslationEndpoint};
use news_intel_digest::enrich::{EnrichCache, Enricher};
use news_intel_digest::feed::{FeedItem, FeedProvider, RawEntry};
use news_intel_digest::source_weights::SourceWeightsConfig;
use news_intel_digest::DigestService;

const PAGE_DESCRIPTION: &str =
    "A soft robotic gripper trained with reinforcement learning picks ripe fruit without bruising it.";
const GOOD_SUMMARY: &str = "研究人员展示了一种新型软体机器人抓手，它通过强化学习训练，能够在不损伤水果的情况下完成采摘。";

struct FakePages {
    fetches: AtomicUsize,
}

#[async_trait]
impl PageFetcher for FakePages {
    async fn fetch_html(&self, _url: &str) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            r#"<html><head><meta name="description" content="{PAGE_DESCRIPTION}"></head><body><p>short</p></body></html>"#
        ))
    }
}

struct OneItem;

#[async_trait]
impl FeedProvider for OneItem {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>> {
        Ok(vec![robot_item(source.label())])
    }
    fn name(&self) -> &'static str {
        "one-item"
    }
}

fn robot_item(source: &str) -> FeedItem {
    FeedItem::from_entry(
        RawEntry {
            title: "Robotics Research Update".into(),
            link: "https://lab.example/gripper".into(),
            summary: "Comments".into(),
            published: Some("2025-06-10T08:00:00Z".into()),
            ..Default::default()
        },
        source,
        None,
    )
}

struct FixedEndpoint(&'static str);

impl TranslationEndpoint for FixedEndpoint {
    fn translate<'a>(&'a self, _text: &'a str) -> EndpointFuture<'a> {
        let out = self.0.to_string();
        Box::pin(async move { Some(out) })
    }
}

#[tokio::test]
async fn boilerplate_summary_fetches_page_and_escalates_to_alternate_prompt() {
    let llm = Arc::new(MockProvider::scripted([
        Some("An English answer the readability check rejects."),
        Some(GOOD_SUMMARY),
    ]));
    let pages = Arc::new(FakePages {
        fetches: AtomicUsize::new(0),
    });
    let cache = Arc::new(EnrichCache::new());
    let e = Enricher::new(llm.clone(), None, Some(pages.clone() as Arc<dyn PageFetcher>), cache.clone());

    let out = e.enrich_item(robot_item("Lab")).await;
    assert_eq!(out.title_zh, "机器人 研究 更新");
    assert_eq!(out.summary, GOOD_SUMMARY);
    assert_eq!(pages.fetches.load(Ordering::SeqCst), 1);
    // Title came from the phrase map; both LLM calls went to the summary chain.
    assert_eq!(llm.calls(), 2);
    assert_eq!(cache.len(), (1, 1));

    // Same item again: summary served from cache, no further model calls.
    let again = e.enrich_item(robot_item("Lab")).await;
    assert_eq!(again.summary, GOOD_SUMMARY);
    assert_eq!(llm.calls(), 2);
}

#[tokio::test]
async fn exhausted_chain_falls_back_to_page_text() {
    let llm = Arc::new(MockProvider::scripted([None::<String>, None]));
    let pages = Arc::new(FakePages {
        fetches: AtomicUsize::new(0),
    });
    let cache = Arc::new(EnrichCache::new());
    let e = Enricher::new(llm, None, Some(pages as Arc<dyn PageFetcher>), cache.clone());

    let out = e.enrich_item(robot_item("Lab")).await;
    assert_eq!(out.summary, PAGE_DESCRIPTION);
    assert_eq!(cache.len(), (1, 0), "truncated fallbacks are not cached");
}

#[tokio::test]
async fn title_chain_uses_endpoint_after_llm_declines() {
    let llm = MockProvider::scripted([None::<String>]);
    let ep = FixedEndpoint("量化内核在基准测试中超越基线");
    let cache = EnrichCache::new();

    let (zh, stage) = translate::translate_title(
        "Quantized Kernels Beat Baselines",
        &llm,
        Some(&ep as &dyn TranslationEndpoint),
        &cache,
    )
    .await;
    assert_eq!(stage, TitleStage::Endpoint);
    assert_eq!(zh, "量化内核在基准测试中超越基线");
    assert_eq!(llm.calls(), 1);

    let (cached, stage) =
        translate::translate_title("Quantized Kernels Beat Baselines", &llm, None, &cache).await;
    assert_eq!(stage, TitleStage::Cached);
    assert_eq!(cached, zh);
}

#[tokio::test]
async fn title_chain_wraps_when_nothing_translates() {
    let llm = MockProvider::scripted([Some("still English output")]);
    let cache = EnrichCache::new();
    let (zh, stage) =
        translate::translate_title("Quantized Kernels Beat Baselines", &llm, None, &cache).await;
    assert_eq!(stage, TitleStage::Wrapped);
    assert_eq!(zh, "关于「Quantized Kernels Beat Baselines」的更新");
    assert!(cache.is_empty(), "wrapped titles are not cached");
}

#[tokio::test]
async fn forced_refresh_clears_enrichment_cache() {
    let llm = Arc::new(MockProvider::scripted([Some(GOOD_SUMMARY)]));
    let pages = Arc::new(FakePages {
        fetches: AtomicUsize::new(0),
    });
    let cache = Arc::new(EnrichCache::new());
    let enricher = Enricher::new(llm.clone(), None, Some(pages as Arc<dyn PageFetcher>), cache.clone());
    let cat = CategoryConfig {
        id: "robots".into(),
        name: "Robots".into(),
        zh_name: "机器人".into(),
        description: String::new(),
        zh_description: String::new(),
        limit: 5,
        home: true,
        require_in_scope: false,
        feeds: vec![FeedSource::rss("https://lab.example/rss", "Lab")],
    };
    let svc = DigestService::new(
        vec![cat],
        Arc::new(OneItem),
        Arc::new(PipelineRules::builtin().unwrap()),
        Arc::new(SourceWeightsConfig::default_seed()),
        enricher,
        Duration::from_secs(60),
    );

    let first = svc.get_category("robots", false).await.unwrap();
    assert_eq!(first.items[0].summary, GOOD_SUMMARY);
    assert_eq!(first.items[0].topic, "robotics");
    assert_eq!(svc.enrich_cache().len(), (1, 1));

    let cached = svc.get_category("robots", false).await.unwrap();
    assert_eq!(cached, first);
    assert_eq!(llm.calls(), 1);

    // Script is exhausted, so after the cache is cleared the chain ends at the page text.
    let forced = svc.get_category("robots", true).await.unwrap();
    assert_eq!(forced.items[0].summary, PAGE_DESCRIPTION);
    assert_eq!(llm.calls(), 3);
    assert_eq!(svc.enrich_cache().len(), (1, 0));
}
