//! Error types for the AI module

use thiserror::Error;

/// AI module error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{provider} HTTP {status}: {message}")]
    LlmHttp {
        provider: String,
        status: u16,
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AiError {
    /// Whether retrying the request could help.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LlmHttp { status, .. } => {
                matches!(*status, 408 | 429) || (500..600).contains(status)
            }
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::Llm(message) => {
                let lower = message.to_lowercase();
                lower.contains("rate limit") || lower.contains("overloaded")
            }
            _ => false,
        }
    }

    /// Server-requested retry delay, when the response carried one.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::LlmHttp {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Result type alias for AI operations
pub type Result<T> = std::result::Result<T, AiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_retryability() {
        let cases = [(408, true), (429, true), (500, true), (503, true), (400, false), (401, false), (404, false)];
        for (status, expected) in cases {
            let error = AiError::LlmHttp {
                provider: "Ollama".to_string(),
                status,
                message: String::new(),
                retry_after_secs: None,
            };
            assert_eq!(error.is_retryable(), expected, "status {}", status);
        }
    }

    #[test]
    fn test_retry_after_only_on_http_variant() {
        let error = AiError::LlmHttp {
            provider: "Ollama".to_string(),
            status: 429,
            message: String::new(),
            retry_after_secs: Some(7),
        };
        assert_eq!(error.retry_after(), Some(7));
        assert_eq!(AiError::Llm("rate limit".to_string()).retry_after(), None);
    }
}
