//! Tiered knowledge resolution
//!
//! A waterfall of three cost-ranked strategies for answering factual
//! questions, invoked only when the orchestrator asks for it:
//!
//! 1. keyword/triage match against the scenario catalog (free)
//! 2. semantic similarity over the curated Q&A corpus (cheap)
//! 3. LLM synthesis against the knowledge base (expensive, last resort)
//!
//! plus a reshaping pass that turns a verified fact into natural phrasing.
//! Correctness beats fluency throughout: low-confidence results are never
//! presented as fact, and a failed reshape falls back to the verbatim fact.

pub mod reshape;
pub mod resolver;
pub mod scenarios;
pub mod semantic;
pub mod synthesis;

pub use reshape::FactReshaper;
pub use resolver::{ResolutionOutcome, TieredResolver};
pub use scenarios::ScenarioMatcher;
pub use semantic::SemanticIndex;
pub use synthesis::LlmSynthesis;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use frontdesk_core::TraceTier;

/// Knowledge resolution errors
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] frontdesk_core::ChatError),
    #[error("synthesis produced unusable output: {0}")]
    UnusableOutput(String),
}

/// The three knowledge tiers, by cost rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeTier {
    Keyword,
    Semantic,
    Synthesis,
}

impl KnowledgeTier {
    pub fn number(&self) -> u8 {
        match self {
            Self::Keyword => 1,
            Self::Semantic => 2,
            Self::Synthesis => 3,
        }
    }

    pub fn trace_tier(&self) -> TraceTier {
        match self {
            Self::Keyword => TraceTier::Keyword,
            Self::Semantic => TraceTier::Semantic,
            Self::Synthesis => TraceTier::Synthesis,
        }
    }
}

/// A tier's answer to a knowledge query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAnswer {
    pub tier: KnowledgeTier,
    pub confidence: f32,
    /// Terse verified fact text; reshaping happens separately
    pub factual_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Cost weight of the invocation that produced this
    pub cost: f64,
}
