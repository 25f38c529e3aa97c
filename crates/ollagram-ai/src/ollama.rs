//! Ollama LLM provider
//!
//! Talks to a local Ollama server via its `/api/chat` endpoint. Responses
//! are requested non-streaming (`stream: false`) and with thinking disabled
//! (`think: false`), matching how the relay prompts instruct models.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::client::{CompletionRequest, CompletionResponse, LlmClient, Role, TokenUsage};
use crate::error::{AiError, Result};
use crate::retry::{LlmRetryConfig, response_to_error};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DISABLE_SYSTEM_PROXY_ENV: &str = "OLLAGRAM_DISABLE_SYSTEM_PROXY";

/// Ollama client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    retry_config: LlmRetryConfig,
}

impl OllamaClient {
    /// Create a new client for `model` against the default local server.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            retry_config: LlmRetryConfig::default(),
        }
    }

    /// Set the server base URL (the `OLLAMA_HOST` of the deployment).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_config(mut self, config: LlmRetryConfig) -> Self {
        self.retry_config = config;
        self
    }
}

/// Ollama is almost always a localhost peer, and a system HTTP proxy would
/// swallow those requests. `OLLAGRAM_DISABLE_SYSTEM_PROXY` bypasses the
/// proxy; tests always bypass it since they talk to a local mock server.
fn build_http_client() -> Client {
    let bypass_proxy = std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() || cfg!(test);
    if bypass_proxy {
        Client::builder()
            .no_proxy()
            .build()
            .unwrap_or_else(|_| Client::new())
    } else {
        Client::new()
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    think: bool,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let messages: Vec<OllamaMessage> = request
            .messages
            .iter()
            .map(|m| OllamaMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                }
                .to_string(),
                content: m.content.clone(),
            })
            .collect();

        let body = OllamaRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            think: false,
        };

        let mut last_error = None;

        for attempt in 0..=self.retry_config.max_retries {
            let response = match self
                .client
                .post(format!("{}/api/chat", self.base_url))
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    let error = AiError::Http(e);
                    if !error.is_retryable() || attempt == self.retry_config.max_retries {
                        return Err(error);
                    }
                    let delay = self.retry_config.delay_for(attempt + 1, None);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis(),
                        "Retrying Ollama request after connection error"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(error);
                    continue;
                }
            };

            if response.status().is_success() {
                let data: OllamaResponse = response.json().await?;
                let message = data
                    .message
                    .ok_or_else(|| AiError::InvalidFormat("Ollama response had no message".to_string()))?;

                let usage = match (data.prompt_eval_count, data.eval_count) {
                    (None, None) => None,
                    (prompt, completion) => {
                        let prompt_tokens = prompt.unwrap_or(0);
                        let completion_tokens = completion.unwrap_or(0);
                        Some(TokenUsage {
                            prompt_tokens,
                            completion_tokens,
                            total_tokens: prompt_tokens + completion_tokens,
                        })
                    }
                };

                return Ok(CompletionResponse {
                    content: message.content,
                    usage,
                });
            }

            let error = response_to_error(response, "Ollama").await;
            if !error.is_retryable() || attempt == self.retry_config.max_retries {
                return Err(error);
            }

            let delay = self
                .retry_config
                .delay_for(attempt + 1, error.retry_after());
            tracing::warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis(),
                "Retrying Ollama request"
            );
            tokio::time::sleep(delay).await;
            last_error = Some(error);
        }

        Err(last_error
            .unwrap_or_else(|| AiError::Llm("Ollama request failed after retries".to_string())))
    }
}
