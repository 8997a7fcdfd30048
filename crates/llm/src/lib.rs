//! Chat-completion backends
//!
//! Provider-agnostic implementations of `frontdesk_core::ChatModel`:
//! - `OllamaBackend` for a local Ollama server
//! - `OpenAiBackend` for any OpenAI-compatible endpoint
//!
//! Both retry transient failures with exponential backoff and bound every
//! request with the configured timeout. The engine adds its own outer
//! timeout on top; a model failure is never fatal to a turn.

pub mod backend;
pub mod factory;
pub mod prompt;

pub use backend::{OllamaBackend, OpenAiBackend};
pub use factory::LlmFactory;
pub use prompt::{Message, Role};

use thiserror::Error;

/// LLM backend errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("API error: {0}")]
    Api(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for frontdesk_core::ChatError {
    fn from(err: LlmError) -> Self {
        use frontdesk_core::ChatError;
        match err {
            LlmError::Network(msg) => ChatError::Unavailable(msg),
            LlmError::Timeout => ChatError::Timeout,
            LlmError::Api(msg) => ChatError::Api(msg),
            LlmError::InvalidResponse(msg) => ChatError::InvalidResponse(msg),
            LlmError::Configuration(msg) => ChatError::Configuration(msg),
        }
    }
}

/// Rough token estimate for usage accounting: ~4 characters per token for
/// English, counted in grapheme clusters.
pub fn estimate_tokens(text: &str) -> usize {
    use unicode_segmentation::UnicodeSegmentation;
    text.graphemes(true).count().max(1) / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_scales_with_length() {
        let short = estimate_tokens("hello");
        let long = estimate_tokens("hello there, this is a much longer utterance about a furnace");
        assert!(long > short);
    }
}
