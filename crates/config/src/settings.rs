//! Process-level settings
//!
//! Layered the same way across environments: `config/default.yaml`, then
//! `config/{env}.yaml`, then `FRONTDESK_*` environment variables. All
//! defaults are applied here; downstream code reads plain fields.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Chat-completion backend configuration
    #[serde(default)]
    pub llm: LlmProviderSettings,

    /// Turn-engine tunables
    #[serde(default)]
    pub engine: EngineSettings,

    /// Context store tunables
    #[serde(default)]
    pub store: StoreSettings,

    /// Directory of per-company runtime config files
    #[serde(default = "default_company_config_dir")]
    pub company_config_dir: String,
}

fn default_company_config_dir() -> String {
    "config/companies".to_string()
}

/// Supported chat-completion providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Ollama,
    /// Any OpenAI-compatible endpoint (OpenAI, Azure, vLLM, ...)
    Openai,
}

/// Chat backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderSettings {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
    /// Retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff in milliseconds; doubles each retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}
fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_max_tokens() -> usize {
    512
}
fn default_temperature() -> f32 {
    0.2
}
fn default_llm_timeout_ms() -> u64 {
    8_000
}
fn default_max_retries() -> u32 {
    2
}
fn default_initial_backoff_ms() -> u64 {
    100
}

impl Default for LlmProviderSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            endpoint: default_endpoint(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_ms: default_llm_timeout_ms(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

/// Turn-engine tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// External bound on the decision call, on top of backend timeouts
    #[serde(default = "default_decision_timeout_ms")]
    pub decision_timeout_ms: u64,
    /// External bound on each knowledge tier
    #[serde(default = "default_knowledge_timeout_ms")]
    pub knowledge_timeout_ms: u64,
    /// Transcript lines included in the decision prompt
    #[serde(default = "default_prompt_transcript_lines")]
    pub prompt_transcript_lines: usize,
}

fn default_decision_timeout_ms() -> u64 {
    10_000
}
fn default_knowledge_timeout_ms() -> u64 {
    6_000
}
fn default_prompt_transcript_lines() -> usize {
    12
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            decision_timeout_ms: default_decision_timeout_ms(),
            knowledge_timeout_ms: default_knowledge_timeout_ms(),
            prompt_transcript_lines: default_prompt_transcript_lines(),
        }
    }
}

/// Context store tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Context time-to-live in seconds; refreshed on every save
    #[serde(default = "default_context_ttl_secs")]
    pub context_ttl_secs: u64,
}

fn default_context_ttl_secs() -> u64 {
    4 * 60 * 60
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            context_ttl_secs: default_context_ttl_secs(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Range checks for values that would misbehave silently.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.timeout_ms < 500 {
            return Err(ConfigError::InvalidValue {
                field: "llm.timeout_ms".to_string(),
                message: "timeout below 500ms leaves no room for generation".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("must be between 0.0 and 2.0, got {}", self.llm.temperature),
            });
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_tokens".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.engine.prompt_transcript_lines == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.prompt_transcript_lines".to_string(),
                message: "must include at least one line".to_string(),
            });
        }
        if self.store.context_ttl_secs < 60 {
            return Err(ConfigError::InvalidValue {
                field: "store.context_ttl_secs".to_string(),
                message: "TTL below one minute would expire mid-call".to_string(),
            });
        }
        Ok(())
    }
}

/// Load settings from config files and environment.
///
/// Order: `config/default.yaml`, then `config/{env}.yaml` when `env` is
/// given, then `FRONTDESK_*` env vars (e.g. `FRONTDESK_LLM__MODEL`).
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    if Path::new("config/default.yaml").exists() {
        builder = builder.add_source(File::with_name("config/default"));
    }

    if let Some(env_name) = env {
        let env_path = format!("config/{}", env_name);
        if Path::new(&format!("{}.yaml", env_path)).exists() {
            builder = builder.add_source(File::with_name(&env_path));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("FRONTDESK")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    settings.validate()?;

    tracing::info!(
        environment = ?settings.environment,
        provider = ?settings.llm.provider,
        model = %settings.llm.model,
        "settings loaded"
    );

    Ok(settings)
}
