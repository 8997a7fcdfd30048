//! Per-turn call orchestration engine
//!
//! Takes one caller utterance, decides what the agent should do and say
//! next, brings in verified knowledge when needed, and materializes a
//! booking once enough information has been gathered. The engine never
//! stalls or crashes on a dependency failure: every external call has a
//! deterministic fallback and `process_caller_turn` always returns a valid
//! reply.
//!
//! Flow per turn: context load → frontline classifier → orchestrator →
//! guardrails → [optional] knowledge resolver → context merge+save →
//! [optional] booking → async trace → reply.

pub mod booking;
pub mod classifier;
pub mod orchestrator;
pub mod trace;
pub mod turn;

pub use booking::{select_rule, AppointmentMaterializer, RuleContext};
pub use classifier::classify;
pub use orchestrator::{DecisionOutcome, Orchestrator};
pub use trace::{TraceRecorder, TraceSink, TracingSink, TurnTrace};
pub use turn::{TurnEngine, TurnReply};

use thiserror::Error;

/// Engine error taxonomy.
///
/// Only `BookingFailed` and non-recoverable `MalformedDecision` conditions
/// ever change the visible action; everything else is absorbed into a safe
/// conversational continuation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Context store I/O failure; degrade to a fresh re-init
    #[error("context unavailable: {0}")]
    ContextUnavailable(String),
    /// Invalid or incomplete LLM decision; deterministic fallback
    #[error("malformed decision: {0}")]
    MalformedDecision(String),
    /// Knowledge resolver threw; escalate to a human
    #[error("knowledge lookup failed: {0}")]
    KnowledgeLookupFailed(String),
    /// Persistence error during appointment creation; escalate, no retry
    #[error("booking failed: {0}")]
    BookingFailed(String),
    /// Always caught and logged, never surfaced
    #[error("trace logging failed: {0}")]
    TraceLoggingFailed(String),
    /// Call archive write failed; the live context is kept
    #[error("archive failed: {0}")]
    ArchiveFailed(String),
}
