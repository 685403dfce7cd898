// src/enrich/summarize.rs
//! Summary chain: primary prompt → alternate prompt → truncated source text.
//! Model output must pass the readability predicate to be used.

use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;

use super::cache::EnrichCache;
use super::llm::LlmProvider;
use crate::text;

pub const MIN_SUMMARY_CHARS: usize = 28;
pub const MAX_SUMMARY_CHARS: usize = 260;
pub const MIN_CHINESE_RATIO: f32 = 0.3;
pub const MAX_SENTENCES: usize = 6;
/// Length of the raw-text fallback.
pub const TRUNCATE_CHARS: usize = 160;

const BANNED: &[&str] = &[
    "\u{FFFD}",
    "抱歉",
    "无法访问",
    "无法提供",
    "作为AI",
    "作为一个AI",
    "人工智能助手",
    "以下是",
    "http://",
    "https://",
    "**",
];

const PRIMARY_PROMPT: &str = "你是科技新闻编辑。根据用户提供的标题和正文，用简体中文写 2 到 3 句摘要，\
总长度 60 到 160 字，说明发生了什么以及为什么重要。公司、模型和人名保留原文。\
不要使用 Markdown、标题或项目符号，只输出摘要正文。";

const ALTERNATE_PROMPT: &str = "把下面的新闻内容概括成一到两句简体中文，不超过 100 字。\
只输出中文句子，不要任何前缀、解释或格式。";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStage {
    Cached,
    LlmPrimary,
    LlmAlternate,
    Truncated,
}

impl SummaryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::LlmPrimary => "llm_primary",
            Self::LlmAlternate => "llm_alternate",
            Self::Truncated => "truncated",
        }
    }
}

fn re_sentence_end() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"[。！？!?；]+").expect("sentence regex"))
}

fn re_latin_token() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z][A-Za-z0-9\-\.]*[A-Za-z0-9]").expect("token regex"))
}

pub fn sentence_count(s: &str) -> usize {
    re_sentence_end()
        .split(s)
        .filter(|seg| !seg.trim().is_empty())
        .count()
}

/// Name-like Latin tokens of a title: acronyms, mixed case (`OpenAI`) or containing digits.
/// Plain title-case words are not hints since the summary translates them.
fn latin_hints(title: &str) -> Vec<String> {
    re_latin_token()
        .find_iter(title)
        .map(|m| m.as_str())
        .filter(|t| {
            let upper_after_first = t.chars().skip(1).any(|c| c.is_ascii_uppercase());
            let digit = t.chars().any(|c| c.is_ascii_digit());
            t.len() >= 2 && (upper_after_first || digit)
        })
        .map(|t| t.to_lowercase())
        .collect()
}

fn chinese_bigrams(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .windows(2)
        .filter(|w| w.iter().all(|c| text::is_chinese_char(*c)))
        .map(|w| w.iter().collect())
        .collect()
}

/// Shares a name-like token with the title, or a Chinese bigram with its translation.
/// Titles that offer neither are not checked.
pub fn relevant_to_title(summary: &str, title: &str, title_zh: Option<&str>) -> bool {
    let latin = latin_hints(title);
    let bigrams = title_zh.map(chinese_bigrams).unwrap_or_default();
    if latin.is_empty() && bigrams.is_empty() {
        return true;
    }
    let lower = summary.to_lowercase();
    latin.iter().any(|t| lower.contains(t.as_str())) || bigrams.iter().any(|b| summary.contains(b.as_str()))
}

/// Page-level check used when assembling the home digest.
pub fn readable_for_display(s: &str) -> bool {
    let t = text::squash_ws(s);
    let n = t.chars().count();
    text::has_chinese(&t)
        && !t.contains('\u{FFFD}')
        && !t.starts_with('#')
        && (MIN_SUMMARY_CHARS..=MAX_SUMMARY_CHARS).contains(&n)
}

/// Full predicate for model output.
pub fn is_readable_summary(s: &str, title: &str, title_zh: Option<&str>) -> bool {
    if !readable_for_display(s) {
        return false;
    }
    if text::chinese_ratio(s) < MIN_CHINESE_RATIO {
        return false;
    }
    if BANNED.iter().any(|b| s.contains(b)) {
        return false;
    }
    let sentences = sentence_count(s);
    if sentences == 0 || sentences > MAX_SENTENCES {
        return false;
    }
    relevant_to_title(s, title, title_zh)
}

fn tidy_model_summary(s: &str) -> String {
    let s = text::clean(s);
    let s = s
        .trim_start_matches("摘要：")
        .trim_start_matches("总结：")
        .trim_matches(|c| matches!(c, '"' | '“' | '”' | '「' | '」'));
    s.trim().to_string()
}

/// Summarize `source_text` for an item titled `title`. `title_zh` feeds the relevance check.
pub async fn summarize(
    title: &str,
    title_zh: Option<&str>,
    source_text: &str,
    llm: &dyn LlmProvider,
    cache: &EnrichCache,
) -> (String, SummaryStage) {
    let source_text = source_text.trim();
    if source_text.is_empty() {
        return (String::new(), SummaryStage::Truncated);
    }
    if let Some(hit) = cache.summary(title, source_text) {
        return (hit, SummaryStage::Cached);
    }

    let user = format!("标题：{title}\n正文：{source_text}");
    for (prompt, stage) in [
        (PRIMARY_PROMPT, SummaryStage::LlmPrimary),
        (ALTERNATE_PROMPT, SummaryStage::LlmAlternate),
    ] {
        let Some(out) = llm.complete(prompt, &user).await else {
            continue;
        };
        let out = tidy_model_summary(&out);
        if is_readable_summary(&out, title, title_zh) {
            cache.put_summary(title, source_text, &out);
            counter!("enrich_fallback_total", "chain" => "summary", "stage" => stage.as_str()).increment(1);
            return (out, stage);
        }
        tracing::debug!(target: "enrich", stage = stage.as_str(), title, "summary rejected by readability check");
    }

    counter!("enrich_fallback_total", "chain" => "summary", "stage" => SummaryStage::Truncated.as_str())
        .increment(1);
    (text::truncate_chars(source_text, TRUNCATE_CHARS), SummaryStage::Truncated)
}
