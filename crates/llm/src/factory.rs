//! Backend factory
//!
//! Picks a backend from provider settings so callers never name a concrete
//! implementation.

use std::sync::Arc;

use frontdesk_config::{LlmProvider, LlmProviderSettings};
use frontdesk_core::ChatModel;

use crate::backend::{OllamaBackend, OpenAiBackend};
use crate::LlmError;

pub struct LlmFactory;

impl LlmFactory {
    pub fn create(settings: &LlmProviderSettings) -> Result<Arc<dyn ChatModel>, LlmError> {
        let backend: Arc<dyn ChatModel> = match settings.provider {
            LlmProvider::Ollama => Arc::new(OllamaBackend::new(settings.clone())?),
            LlmProvider::Openai => Arc::new(OpenAiBackend::new(settings.clone())?),
        };

        tracing::info!(
            provider = ?settings.provider,
            model = %settings.model,
            endpoint = %settings.endpoint,
            "chat backend initialized"
        );

        Ok(backend)
    }
}
