//! Provider-agnostic chat completion trait
//!
//! The engine makes at most two model calls per turn (decision + reshape),
//! both through this seam. Backends are swappable at runtime and every call
//! site treats a failure as a normal, recoverable condition.

use async_trait::async_trait;
use thiserror::Error;

/// Chat backend failures. Timeouts are deliberately their own variant so
/// call sites can log them distinctly, but every variant is handled the
/// same way: fall back deterministically.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("request timed out")]
    Timeout,
    #[error("API error: {0}")]
    Api(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// One completion request: a system prompt and a user prompt.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Sampling temperature; decision calls run low.
    pub temperature: f32,
    /// Hard cap on generated tokens.
    pub max_tokens: usize,
}

impl ChatRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.2,
            max_tokens: 512,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Completion result with enough metadata for usage accounting.
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub text: String,
    pub tokens: usize,
    pub latency_ms: u64,
}

/// Chat-completion backend
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ChatError>;

    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_defaults() {
        let req = ChatRequest::new("sys", "user");
        assert_eq!(req.temperature, 0.2);
        assert_eq!(req.max_tokens, 512);
    }

    #[test]
    fn test_request_builder_overrides() {
        let req = ChatRequest::new("sys", "user")
            .with_temperature(0.0)
            .with_max_tokens(128);
        assert_eq!(req.temperature, 0.0);
        assert_eq!(req.max_tokens, 128);
    }
}
