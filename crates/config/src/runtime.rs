//! Per-company runtime configuration
//!
//! Everything the engine consumes about one company for one turn: variable
//! values, keyword lexicon sources, the scenario catalog, the curated Q&A
//! corpus, knowledge-base documents, booking rules, confidence thresholds
//! and feature flags. Loaded once (YAML), fully defaulted, then read-only.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use frontdesk_core::BookingRule;

use crate::ConfigError;

/// Tier-1 scenario: a preconfigured triage answer keyed by keywords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    /// Keywords any of which may trigger this scenario
    pub keywords: Vec<String>,
    /// The verified answer to give
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Tier-2 curated question/answer pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaPair {
    pub id: String,
    pub question: String,
    pub answer: String,
}

/// Tier-3 knowledge-base document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDoc {
    pub id: String,
    pub title: String,
    pub body: String,
}

/// Per-tier confidence thresholds and cost weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    /// Minimum score for a tier-1 scenario hit
    #[serde(default = "default_tier1_min")]
    pub tier1_min: f32,
    /// Minimum cosine similarity for a tier-2 match
    #[serde(default = "default_tier2_min")]
    pub tier2_min: f32,
    /// Below this, no result is ever presented as fact
    #[serde(default = "default_authoritative_min")]
    pub authoritative_min: f32,
    /// Cost weights per invocation, used for usage accounting
    #[serde(default = "default_tier2_cost")]
    pub tier2_cost: f64,
    #[serde(default = "default_tier3_cost")]
    pub tier3_cost: f64,
}

fn default_tier1_min() -> f32 {
    0.6
}
fn default_tier2_min() -> f32 {
    0.55
}
fn default_authoritative_min() -> f32 {
    0.5
}
fn default_tier2_cost() -> f64 {
    0.0005
}
fn default_tier3_cost() -> f64 {
    0.004
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            tier1_min: default_tier1_min(),
            tier2_min: default_tier2_min(),
            authoritative_min: default_authoritative_min(),
            tier2_cost: default_tier2_cost(),
            tier3_cost: default_tier3_cost(),
        }
    }
}

/// Feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// When off, every turn uses the deterministic fallback builder
    #[serde(default = "default_true")]
    pub orchestrator_enabled: bool,
    /// Include model debug notes in trace output
    #[serde(default)]
    pub debug_orchestrator: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            orchestrator_enabled: true,
            debug_orchestrator: false,
        }
    }
}

/// What the company has actually configured itself to offer. Guardrails
/// strip claims the configuration does not support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub around_the_clock: bool,
    #[serde(default)]
    pub emergency_service: bool,
}

/// One company's runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub company_id: String,
    #[serde(default = "default_config_version")]
    pub config_version: String,
    #[serde(default)]
    pub trade: String,
    /// Named variable values (greeting, hours, service_area, diagnostic_fee, ...)
    #[serde(default)]
    pub variables: HashMap<String, String>,
    /// Words stripped from utterances before classification
    #[serde(default)]
    pub filler_words: Vec<String>,
    /// Phrase -> canonical term rewrites applied before classification
    #[serde(default)]
    pub synonyms: HashMap<String, String>,
    /// Extra keyword sources merged into the built-in lexicon
    #[serde(default)]
    pub emergency_keywords: Vec<String>,
    #[serde(default)]
    pub spam_keywords: Vec<String>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub qa_pairs: Vec<QaPair>,
    #[serde(default)]
    pub knowledge_docs: Vec<KnowledgeDoc>,
    #[serde(default)]
    pub booking_rules: Vec<BookingRule>,
    #[serde(default)]
    pub thresholds: TierThresholds,
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub capabilities: Capabilities,
}

fn default_config_version() -> String {
    "v1".to_string()
}

impl RuntimeConfig {
    /// Minimal configuration used when a company has none on file. The call
    /// still proceeds; it just has no knowledge catalog or booking rules.
    pub fn fallback(company_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            config_version: "fallback".to_string(),
            trade: String::new(),
            variables: HashMap::new(),
            filler_words: Vec::new(),
            synonyms: HashMap::new(),
            emergency_keywords: Vec::new(),
            spam_keywords: Vec::new(),
            scenarios: Vec::new(),
            qa_pairs: Vec::new(),
            knowledge_docs: Vec::new(),
            booking_rules: Vec::new(),
            thresholds: TierThresholds::default(),
            features: FeatureFlags::default(),
            capabilities: Capabilities::default(),
        }
    }

    /// Load one company's config from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self =
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        tracing::info!(
            company_id = %config.company_id,
            config_version = %config.config_version,
            scenarios = config.scenarios.len(),
            qa_pairs = config.qa_pairs.len(),
            "runtime config loaded"
        );
        Ok(config)
    }

    /// Whether any configured variable looks price-like, either by key name
    /// or by a currency amount in its value. Companies without one get the
    /// price guardrail.
    pub fn has_price_variable(&self) -> bool {
        self.variables.iter().any(|(key, value)| {
            let key = key.to_lowercase();
            key.contains("price")
                || key.contains("cost")
                || key.contains("fee")
                || key.contains("rate")
                || key.contains("charge")
                || value.contains('$')
        })
    }

    /// Value of a named variable, if configured
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_yaml_gets_full_defaults() {
        let config: RuntimeConfig = serde_yaml::from_str("company_id: co-1\n").unwrap();
        assert_eq!(config.config_version, "v1");
        assert!(config.features.orchestrator_enabled);
        assert_eq!(config.thresholds.authoritative_min, 0.5);
        assert!(!config.capabilities.emergency_service);
        assert!(config.booking_rules.is_empty());
    }

    #[test]
    fn test_price_variable_by_key() {
        let mut config = RuntimeConfig::fallback("co-1");
        assert!(!config.has_price_variable());

        config
            .variables
            .insert("diagnostic_fee".to_string(), "89".to_string());
        assert!(config.has_price_variable());
    }

    #[test]
    fn test_price_variable_by_value() {
        let mut config = RuntimeConfig::fallback("co-1");
        config
            .variables
            .insert("promo".to_string(), "$25 off first visit".to_string());
        assert!(config.has_price_variable());
    }

    #[test]
    fn test_full_company_yaml() {
        let yaml = r#"
company_id: desert-air
config_version: "2024-06"
trade: HVAC
variables:
  greeting: "Thanks for calling Desert Air!"
  hours: "Mon-Fri 7am-6pm"
scenarios:
  - id: no-cool
    keywords: [not cooling, warm air, no cold air]
    answer: "A system blowing warm air usually needs a refrigerant or capacitor check."
    category: cooling
qa_pairs:
  - id: qa-1
    question: "Do you service heat pumps?"
    answer: "Yes, we service all heat pump brands."
booking_rules:
  - id: weekday-normal
    trade: HVAC
    priority: normal
    days_of_week: [Mon, Tue, Wed, Thu, Fri]
    weekend_allowed: false
capabilities:
  emergency_service: true
"#;
        let config: RuntimeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.company_id, "desert-air");
        assert_eq!(config.scenarios.len(), 1);
        assert_eq!(config.booking_rules[0].days_of_week.len(), 5);
        assert!(config.capabilities.emergency_service);
        assert!(!config.has_price_variable());
    }
}
