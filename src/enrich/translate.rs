// src/enrich/translate.rs
//! Title translation chain: phrase map → LLM → lightweight endpoint → wrapped fallback.
//! A candidate is accepted only if it does not need a better translation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::cache::EnrichCache;
use super::llm::LlmProvider;
use crate::text;

pub const UNTITLED_ZH: &str = "未命名内容";

/// English phrase → Chinese replacement, applied longest phrase first on word boundaries.
const PHRASES: &[(&str, &str)] = &[
    ("Artificial Intelligence", "人工智能"),
    ("Machine Learning", "机器学习"),
    ("Large Language Models", "大语言模型"),
    ("Large Language Model", "大语言模型"),
    ("LLM", "大模型"),
    ("Agent", "智能体"),
    ("Agents", "智能体"),
    ("Neural Network", "神经网络"),
    ("Neural", "神经"),
    ("Neuroscience", "神经科学"),
    ("Brain", "大脑"),
    ("Hippocampal", "海马体"),
    ("EEG", "脑电"),
    ("BCI", "脑机接口"),
    ("Robotics", "机器人"),
    ("Robotic", "机器人"),
    ("Robot", "机器人"),
    ("Automation", "自动化"),
    ("Health", "健康"),
    ("Mental Health", "心理健康"),
    ("Medical", "医学"),
    ("Clinical", "临床"),
    ("Research", "研究"),
    ("Paper", "论文"),
    ("Update", "更新"),
    ("Guide", "指南"),
    ("Trends", "趋势"),
    ("News", "新闻"),
    ("Theory", "理论"),
    ("Safety", "安全"),
    ("Governance", "治理"),
    ("Policy", "政策"),
];

const TITLE_SYSTEM_PROMPT: &str = "你是科技新闻编辑。把用户给出的英文新闻标题翻译成简洁、自然的简体中文标题。\
保留专有名词（公司、模型、人名）原文。只输出译文，不要引号、解释或前缀。";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleStage {
    /// Title already contained Chinese.
    Original,
    Cached,
    Phrase,
    Llm,
    Endpoint,
    Wrapped,
}

impl TitleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Cached => "cached",
            Self::Phrase => "phrase",
            Self::Llm => "llm",
            Self::Endpoint => "endpoint",
            Self::Wrapped => "wrapped",
        }
    }
}

fn phrase_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceCell<Vec<(Regex, &'static str)>> = OnceCell::new();
    RULES.get_or_init(|| {
        let mut sorted: Vec<&(&str, &str)> = PHRASES.iter().collect();
        sorted.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        sorted
            .into_iter()
            .map(|(en, zh)| {
                let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(en)))
                    .expect("phrase regex");
                (re, *zh)
            })
            .collect()
    })
}

fn re_dash() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+-\s+").expect("dash regex"))
}

/// Fewer than 2 Chinese characters or more than 8 Latin letters.
pub fn needs_better_translation(s: &str) -> bool {
    text::chinese_count(s) < 2 || text::latin_count(s) > 8
}

/// Static phrase substitution. The result may still be mostly English.
pub fn phrase_translate(title: &str) -> String {
    let mut out = text::clean(title);
    for (re, zh) in phrase_rules() {
        out = re.replace_all(&out, *zh).into_owned();
    }
    let out = re_dash().replace_all(&out, "：");
    text::squash_ws(&out)
}

/// Last resort that keeps the page Chinese.
pub fn wrap_title(title: &str) -> String {
    format!("关于「{title}」的更新")
}

/// Strip quotes and labels models like to add around a translated title.
fn tidy_model_title(s: &str) -> String {
    let s = text::clean(s);
    let s = s
        .trim_start_matches("标题：")
        .trim_start_matches("译文：")
        .trim_matches(|c| matches!(c, '"' | '“' | '”' | '「' | '」' | '《' | '》' | '\''));
    s.trim().to_string()
}

pub type EndpointFuture<'a> = Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;

/// Machine-translation endpoint used when the LLM is unavailable or unhelpful.
pub trait TranslationEndpoint: Send + Sync {
    fn translate<'a>(&'a self, text: &'a str) -> EndpointFuture<'a>;
}

/// MyMemory-style `GET ?q=...&langpair=en|zh-CN` returning `responseData.translatedText`.
pub struct HttpTranslationEndpoint {
    http: reqwest::Client,
    url: String,
}

impl HttpTranslationEndpoint {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(8))
            .build()
            .context("building translate http client")?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    async fn translate_impl(&self, q: &str) -> Option<String> {
        #[derive(Deserialize)]
        struct Resp {
            #[serde(rename = "responseData")]
            response_data: Data,
        }
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "translatedText")]
            translated_text: String,
        }

        let resp = self
            .http
            .get(&self.url)
            .query(&[("q", q), ("langpair", "en|zh-CN")])
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            debug!(target: "enrich", status = resp.status().as_u16(), "translate endpoint non-2xx");
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        let t = body.response_data.translated_text.trim().to_string();
        (!t.is_empty()).then_some(t)
    }
}

impl TranslationEndpoint for HttpTranslationEndpoint {
    fn translate<'a>(&'a self, text: &'a str) -> EndpointFuture<'a> {
        Box::pin(self.translate_impl(text))
    }
}

/// Run the chain for one title. Accepted results are cached; the wrapped fallback is not,
/// so a later run with a working provider can still improve it.
pub async fn translate_title(
    title: &str,
    llm: &dyn LlmProvider,
    endpoint: Option<&dyn TranslationEndpoint>,
    cache: &EnrichCache,
) -> (String, TitleStage) {
    let source = text::clean(title);
    if source.is_empty() {
        return (UNTITLED_ZH.to_string(), TitleStage::Original);
    }
    if text::has_chinese(&source) {
        return (source, TitleStage::Original);
    }
    if let Some(hit) = cache.title(&source) {
        return (hit, TitleStage::Cached);
    }

    let phrase = phrase_translate(&source);
    let accepted = if !needs_better_translation(&phrase) {
        Some((phrase, TitleStage::Phrase))
    } else {
        None
    };

    let accepted = match accepted {
        Some(a) => Some(a),
        None => llm
            .complete(TITLE_SYSTEM_PROMPT, &source)
            .await
            .map(|s| tidy_model_title(&s))
            .filter(|s| !needs_better_translation(s))
            .map(|s| (s, TitleStage::Llm)),
    };

    let accepted = match (accepted, endpoint) {
        (Some(a), _) => Some(a),
        (None, Some(ep)) => ep
            .translate(&source)
            .await
            .map(|s| tidy_model_title(&s))
            .filter(|s| !needs_better_translation(s))
            .map(|s| (s, TitleStage::Endpoint)),
        (None, None) => None,
    };

    match accepted {
        Some((zh, stage)) => {
            cache.put_title(&source, &zh);
            counter!("enrich_fallback_total", "chain" => "title", "stage" => stage.as_str()).increment(1);
            (zh, stage)
        }
        None => {
            counter!("enrich_fallback_total", "chain" => "title", "stage" => TitleStage::Wrapped.as_str())
                .increment(1);
            (wrap_title(&source), TitleStage::Wrapped)
        }
    }
}
