//! Ollagram AI - LLM client abstraction.
//!
//! The router talks to the model through the [`LlmClient`] trait; the only
//! production implementation is [`OllamaClient`] against a local Ollama
//! server. [`MockLlmClient`] backs router tests with scripted responses.

mod client;
mod error;
mod mock_client;
mod ollama;
mod retry;

pub use client::{CompletionRequest, CompletionResponse, LlmClient, Message, Role, TokenUsage};
pub use error::{AiError, Result};
pub use mock_client::{MockLlmClient, MockStep};
pub use ollama::OllamaClient;
pub use retry::LlmRetryConfig;
