// src/enrich/llm.rs
//! LLM provider abstraction: an OpenAI-compatible chat client, a scripted mock, and a disabled stub.
//! Providers return `None` on any failure; callers fall through to their next strategy.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;

pub type LlmFuture<'a> = Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;

pub trait LlmProvider: Send + Sync {
    /// One chat completion. `system` sets the task, `user` carries the content.
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> LlmFuture<'a>;
    fn name(&self) -> &'static str;
}

pub type DynLlm = Arc<dyn LlmProvider>;

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiProvider {
    http: reqwest::Client,
    cfg: LlmConfig,
}

impl OpenAiProvider {
    pub fn new(cfg: LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("news-intel-digest/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .context("building llm http client")?;
        Ok(Self { http, cfg })
    }

    async fn complete_impl(&self, system: &str, user: &str) -> Option<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.cfg.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.2,
            max_tokens: 300,
        };

        let resp = self
            .http
            .post(&self.cfg.api_url)
            .bearer_auth(&self.cfg.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| debug!(target: "enrich", error = %e, "llm request failed"))
            .ok()?;
        if !resp.status().is_success() {
            debug!(target: "enrich", status = resp.status().as_u16(), "llm non-2xx");
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        let content = body.choices.into_iter().next()?.message.content;
        let content = content.trim();
        (!content.is_empty()).then(|| content.to_string())
    }
}

impl LlmProvider for OpenAiProvider {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> LlmFuture<'a> {
        Box::pin(self.complete_impl(system, user))
    }
    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Always `None`; used when no key is configured.
pub struct DisabledProvider;

impl LlmProvider for DisabledProvider {
    fn complete<'a>(&'a self, _system: &'a str, _user: &'a str) -> LlmFuture<'a> {
        Box::pin(async { None })
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Replays scripted answers in order (then `None`) and counts calls. For tests and local runs.
#[derive(Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<Option<String>>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn scripted<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(answers.into_iter().map(|a| a.map(Into::into)).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmProvider for MockProvider {
    fn complete<'a>(&'a self, _system: &'a str, _user: &'a str) -> LlmFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .flatten();
        Box::pin(async move { next })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Real provider when configured, disabled stub otherwise.
pub fn build_provider(cfg: Option<&LlmConfig>) -> Result<DynLlm> {
    match cfg {
        Some(c) => Ok(Arc::new(OpenAiProvider::new(c.clone())?)),
        None => Ok(Arc::new(DisabledProvider)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_replays_script_then_none() {
        let m = MockProvider::scripted([Some("一"), None, Some("三")]);
        assert_eq!(m.complete("s", "u").await.as_deref(), Some("一"));
        assert_eq!(m.complete("s", "u").await, None);
        assert_eq!(m.complete("s", "u").await.as_deref(), Some("三"));
        assert_eq!(m.complete("s", "u").await, None);
        assert_eq!(m.calls(), 4);
    }

    #[tokio::test]
    async fn disabled_and_factory() {
        assert_eq!(DisabledProvider.complete("s", "u").await, None);
        let p = build_provider(None).unwrap();
        assert_eq!(p.name(), "disabled");
    }
}
