//! Core types for the frontdesk call engine
//!
//! Foundational types shared by every other crate:
//! - Per-call context (`CallContext`) with extracted caller info, transcript
//!   and tier-resolution audit trail
//! - Orchestrator decision protocol (`AgentAction`, `OrchestratorDecision`)
//! - Frontline intent classification types
//! - Booking rules
//! - The provider-agnostic `ChatModel` trait

pub mod booking;
pub mod context;
pub mod decision;
pub mod intent;
pub mod traits;
pub mod usage;

pub use booking::{BookingRule, RulePriority};
pub use context::{
    AccessInfo, CallContext, ContactInfo, ExtractedInfo, ExtractedPatch, ProblemInfo,
    SchedulingInfo, ServiceLocation, Speaker, TierResolution, TraceTier, TranscriptEntry,
    CONTEXT_SCHEMA_VERSION,
};
pub use decision::{
    extract_json_object, AgentAction, DecisionError, DecisionFlags, DecisionUpdates,
    OrchestratorDecision, RawDecision,
};
pub use intent::{CallerIntent, Classification, IntentSignals};
pub use traits::{ChatCompletion, ChatError, ChatModel, ChatRequest};
pub use usage::UsageData;
