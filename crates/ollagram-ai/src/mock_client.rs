//! Deterministic mock LLM client for router and reliability tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

use crate::client::{CompletionRequest, CompletionResponse, LlmClient, TokenUsage};
use crate::error::{AiError, Result};

/// Scripted completion step with optional delay.
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Return an assistant reply.
    Text(String),
    /// Return an LLM error.
    Error(String),
    /// Sleep, then return a reply. Exercises slow-model paths.
    Delayed { delay_ms: u64, content: String },
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn delayed(delay_ms: u64, content: impl Into<String>) -> Self {
        Self::Delayed {
            delay_ms,
            content: content.into(),
        }
    }
}

/// A deterministic mock LLM client driven by scripted steps.
///
/// Steps are consumed front-to-back; an exhausted script returns an error,
/// which makes over-consumption visible in tests. The last request's
/// messages are recorded for prompt assertions.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    model: String,
    script: Arc<Mutex<VecDeque<MockStep>>>,
    last_request: Arc<Mutex<Option<CompletionRequest>>>,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_steps(model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::from(steps))),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn push_step(&self, step: MockStep) {
        self.script.lock().await.push_back(step);
    }

    /// Messages of the most recent `complete` call.
    pub async fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().await.clone()
    }

    fn usage_for(content: &str) -> TokenUsage {
        let completion_tokens = content.len() as u32;
        TokenUsage {
            prompt_tokens: 1,
            completion_tokens,
            total_tokens: 1 + completion_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        *self.last_request.lock().await = Some(request);

        let step = self
            .script
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| AiError::Llm("mock script exhausted".to_string()))?;

        match step {
            MockStep::Text(content) => Ok(CompletionResponse {
                usage: Some(Self::usage_for(&content)),
                content,
            }),
            MockStep::Error(message) => Err(AiError::Llm(message)),
            MockStep::Delayed { delay_ms, content } => {
                sleep(Duration::from_millis(delay_ms)).await;
                Ok(CompletionResponse {
                    usage: Some(Self::usage_for(&content)),
                    content,
                })
            }
        }
    }
}
