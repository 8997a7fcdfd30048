//! Configuration for the frontdesk engine
//!
//! Two layers, both fully resolved at load time so the engine never
//! branches on "is this field present":
//! - `Settings`: process-level configuration (LLM provider, timeouts,
//!   store TTL), layered from YAML files and `FRONTDESK_*` env vars.
//! - `RuntimeConfig`: per-company configuration (variables, keyword
//!   lexicon, scenario catalog, Q&A corpus, booking rules, feature flags),
//!   consumed read-only per turn.

pub mod lexicon;
pub mod provider;
pub mod runtime;
pub mod settings;

pub use lexicon::CompiledLexicon;
pub use provider::{CompanyRuntime, ConfigProvider, StaticConfigProvider};
pub use runtime::{
    Capabilities, FeatureFlags, KnowledgeDoc, QaPair, RuntimeConfig, Scenario, TierThresholds,
};
pub use settings::{
    load_settings, EngineSettings, LlmProvider, LlmProviderSettings, RuntimeEnvironment, Settings,
    StoreSettings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
