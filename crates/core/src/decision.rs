//! Orchestrator decision protocol
//!
//! The LLM answers with a JSON object that parses into `RawDecision`.
//! Validation promotes it to an `OrchestratorDecision`; anything missing
//! `action` or `next_prompt` is a protocol violation and never reaches the
//! caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::ExtractedPatch;
use crate::intent::CallerIntent;

/// Closed action vocabulary. The model may only pick one of these; an
/// unknown string fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    AskQuestion,
    ConfirmInfo,
    AnswerWithKnowledge,
    InitiateBooking,
    UpdateBooking,
    EscalateToHuman,
    SmallTalk,
    CloseCall,
    ClarifyIntent,
    NoOp,
}

impl AgentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AskQuestion => "ask_question",
            Self::ConfirmInfo => "confirm_info",
            Self::AnswerWithKnowledge => "answer_with_knowledge",
            Self::InitiateBooking => "initiate_booking",
            Self::UpdateBooking => "update_booking",
            Self::EscalateToHuman => "escalate_to_human",
            Self::SmallTalk => "small_talk",
            Self::CloseCall => "close_call",
            Self::ClarifyIntent => "clarify_intent",
            Self::NoOp => "no_op",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ask_question" => Some(Self::AskQuestion),
            "confirm_info" => Some(Self::ConfirmInfo),
            "answer_with_knowledge" => Some(Self::AnswerWithKnowledge),
            "initiate_booking" => Some(Self::InitiateBooking),
            "update_booking" => Some(Self::UpdateBooking),
            "escalate_to_human" => Some(Self::EscalateToHuman),
            "small_talk" => Some(Self::SmallTalk),
            "close_call" => Some(Self::CloseCall),
            "clarify_intent" => Some(Self::ClarifyIntent),
            "no_op" | "noop" => Some(Self::NoOp),
            _ => None,
        }
    }

    /// Terminal actions end the agent's handling of the call; guardrails do
    /// not rewrite them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CloseCall | Self::EscalateToHuman)
    }

    /// Every accepted wire value, in prompt order
    pub const ALL: [AgentAction; 10] = [
        Self::AskQuestion,
        Self::ConfirmInfo,
        Self::AnswerWithKnowledge,
        Self::InitiateBooking,
        Self::UpdateBooking,
        Self::EscalateToHuman,
        Self::SmallTalk,
        Self::CloseCall,
        Self::ClarifyIntent,
        Self::NoOp,
    ];
}

impl std::fmt::Display for AgentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean flags the orchestrator may flip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionFlags {
    #[serde(default, alias = "readyToBook")]
    pub ready_to_book: bool,
}

/// State updates carried by a decision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionUpdates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted: Option<ExtractedPatch>,
    #[serde(default)]
    pub flags: DecisionFlags,
}

/// A validated per-turn decision. Ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorDecision {
    pub action: AgentAction,
    pub next_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_intent: Option<CallerIntent>,
    #[serde(default)]
    pub updates: DecisionUpdates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_query: Option<String>,
    #[serde(default)]
    pub needs_knowledge_search: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_notes: Option<String>,
}

impl OrchestratorDecision {
    pub fn new(action: AgentAction, next_prompt: impl Into<String>) -> Self {
        Self {
            action,
            next_prompt: next_prompt.into(),
            updated_intent: None,
            updates: DecisionUpdates::default(),
            knowledge_query: None,
            needs_knowledge_search: false,
            debug_notes: None,
        }
    }

    /// Whether this decision asks the engine to consult the knowledge
    /// resolver.
    pub fn wants_knowledge(&self) -> bool {
        (self.needs_knowledge_search || self.action == AgentAction::AnswerWithKnowledge)
            && self
                .knowledge_query
                .as_deref()
                .map(|q| !q.trim().is_empty())
                .unwrap_or(false)
    }
}

/// Decision validation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecisionError {
    #[error("decision is missing the action field")]
    MissingAction,
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("decision is missing next_prompt")]
    MissingPrompt,
}

/// Pull the outermost JSON object out of raw model text, tolerating
/// markdown code fences and prose around it.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Unvalidated decision as the model wrote it. Field aliases tolerate
/// camelCase output from models that ignore the schema's casing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDecision {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, alias = "nextPrompt")]
    pub next_prompt: Option<String>,
    #[serde(default, alias = "updatedIntent")]
    pub updated_intent: Option<String>,
    #[serde(default)]
    pub updates: Option<RawUpdates>,
    #[serde(default, alias = "knowledgeQuery")]
    pub knowledge_query: Option<String>,
    #[serde(default, alias = "needsKnowledgeSearch")]
    pub needs_knowledge_search: Option<bool>,
    #[serde(default, alias = "debugNotes")]
    pub debug_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUpdates {
    #[serde(default)]
    pub extracted: Option<ExtractedPatch>,
    #[serde(default)]
    pub flags: Option<DecisionFlags>,
}

impl RawDecision {
    /// Promote to a validated decision or report the protocol violation.
    pub fn validate(self) -> Result<OrchestratorDecision, DecisionError> {
        let action_str = self.action.ok_or(DecisionError::MissingAction)?;
        let action = AgentAction::from_str_loose(&action_str)
            .ok_or_else(|| DecisionError::UnknownAction(action_str.clone()))?;

        let next_prompt = self
            .next_prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or(DecisionError::MissingPrompt)?;

        let updates = self
            .updates
            .map(|u| DecisionUpdates {
                extracted: u.extracted,
                flags: u.flags.unwrap_or_default(),
            })
            .unwrap_or_default();

        Ok(OrchestratorDecision {
            action,
            next_prompt,
            updated_intent: self
                .updated_intent
                .as_deref()
                .and_then(CallerIntent::from_str_loose),
            updates,
            knowledge_query: self.knowledge_query.filter(|q| !q.trim().is_empty()),
            needs_knowledge_search: self.needs_knowledge_search.unwrap_or(false),
            debug_notes: self.debug_notes,
        })
    }
}
