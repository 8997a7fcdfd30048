//! Backend implementations
//!
//! Each backend makes one non-streaming chat call per request. Transient
//! failures (network, 5xx, timeout) are retried with exponential backoff;
//! 4xx responses are not.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use frontdesk_config::LlmProviderSettings;
use frontdesk_core::{ChatCompletion, ChatError, ChatModel, ChatRequest};

use crate::prompt::{messages_for, Message};
use crate::{estimate_tokens, LlmError};

fn build_client(settings: &LlmProviderSettings) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(Duration::from_millis(settings.timeout_ms))
        .build()
        .map_err(|e| LlmError::Configuration(format!("failed to create HTTP client: {}", e)))
}

fn is_retryable(error: &LlmError) -> bool {
    matches!(error, LlmError::Network(_) | LlmError::Timeout)
}

/// Retry loop shared by both backends.
async fn with_retries<F, Fut, T>(settings: &LlmProviderSettings, mut attempt_fn: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, LlmError>>,
{
    let mut backoff = Duration::from_millis(settings.initial_backoff_ms);
    let mut last_error = None;

    for attempt in 0..=settings.max_retries {
        if attempt > 0 {
            tracing::warn!(
                attempt,
                max_retries = settings.max_retries,
                backoff_ms = backoff.as_millis() as u64,
                "chat request failed, retrying"
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        match attempt_fn().await {
            Ok(result) => return Ok(result),
            Err(e) if is_retryable(&e) => last_error = Some(e),
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| LlmError::Network("max retries exceeded".to_string())))
}

// =============================================================================
// Ollama
// =============================================================================

/// Backend for a local Ollama server (`/api/chat`, non-streaming).
pub struct OllamaBackend {
    client: Client,
    settings: LlmProviderSettings,
}

impl OllamaBackend {
    pub fn new(settings: LlmProviderSettings) -> Result<Self, LlmError> {
        let client = build_client(&settings)?;
        Ok(Self { client, settings })
    }

    async fn execute(&self, request: &OllamaChatRequest) -> Result<OllamaChatResponse, LlmError> {
        let url = format!("{}/api/chat", self.settings.endpoint.trim_end_matches('/'));
        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(LlmError::Network(format!("server error {}: {}", status, body)));
            }
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ChatModel for OllamaBackend {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ChatError> {
        let start = std::time::Instant::now();

        let wire = OllamaChatRequest {
            model: self.settings.model.clone(),
            messages: messages_for(&request),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens as i32,
            },
        };

        let result = with_retries(&self.settings, || self.execute(&wire)).await?;

        let tokens = result
            .eval_count
            .map(|c| c as usize)
            .unwrap_or_else(|| estimate_tokens(&result.message.content));

        Ok(ChatCompletion {
            text: result.message.content,
            tokens,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaWireMessage,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OllamaWireMessage {
    content: String,
}

// =============================================================================
// OpenAI-compatible
// =============================================================================

/// Backend for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiBackend {
    client: Client,
    settings: LlmProviderSettings,
}

impl OpenAiBackend {
    pub fn new(settings: LlmProviderSettings) -> Result<Self, LlmError> {
        if settings.api_key.is_none() && !settings.endpoint.starts_with("http://localhost") {
            return Err(LlmError::Configuration(
                "API key required for remote endpoints".to_string(),
            ));
        }
        let client = build_client(&settings)?;
        Ok(Self { client, settings })
    }

    async fn execute(&self, request: &OpenAiChatRequest) -> Result<OpenAiChatResponse, LlmError> {
        let url = format!(
            "{}/chat/completions",
            self.settings.endpoint.trim_end_matches('/')
        );

        let mut builder = self.client.post(&url).json(request);
        if let Some(ref key) = self.settings.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(LlmError::Network(format!("server error {}: {}", status, body)));
            }
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ChatModel for OpenAiBackend {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ChatError> {
        let start = std::time::Instant::now();

        let wire = OpenAiChatRequest {
            model: self.settings.model.clone(),
            messages: messages_for(&request),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        let result = with_retries(&self.settings, || self.execute(&wire)).await?;

        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::InvalidResponse("no choices in response".to_string()))?;

        let tokens = result
            .usage
            .map(|u| u.completion_tokens)
            .unwrap_or_else(|| estimate_tokens(&choice.message.content));

        Ok(ChatCompletion {
            text: choice.message.content,
            tokens,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiWireMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiWireMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    completion_tokens: usize,
}
