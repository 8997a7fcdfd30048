//! Per-call context
//!
//! One `CallContext` exists per active call. It is created at call start,
//! mutated at the end of every turn, and deleted only after being archived
//! at call end. All cross-turn state lives here; successive turns of the
//! same call may be served by different process instances, so nothing is
//! kept in process memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intent::CallerIntent;

/// Version of the serialized context envelope. Bump on any incompatible
/// change to `CallContext` or its nested types.
pub const CONTEXT_SCHEMA_VERSION: u32 = 1;

/// Who said a transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Caller,
    Agent,
}

/// One line of the call transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Which stage of the engine produced an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceTier {
    /// Frontline intent classifier
    Frontline,
    /// LLM turn orchestrator
    Orchestrator,
    /// Deterministic fallback decision builder
    Fallback,
    /// Tier 1 keyword/scenario match
    Keyword,
    /// Tier 2 semantic Q&A match
    Semantic,
    /// Tier 3 LLM synthesis
    Synthesis,
    /// Fact reshaping pass
    Reshape,
    /// Guardrail post-filter
    Guardrail,
    /// Appointment materialization
    Booking,
}

impl TraceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frontline => "frontline",
            Self::Orchestrator => "orchestrator",
            Self::Fallback => "fallback",
            Self::Keyword => "keyword",
            Self::Semantic => "semantic",
            Self::Synthesis => "synthesis",
            Self::Reshape => "reshape",
            Self::Guardrail => "guardrail",
            Self::Booking => "booking",
        }
    }
}

/// One audit-trail entry, appended at every resolver/orchestrator decision
/// point. Used for cost accounting and post-call debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierResolution {
    pub tier: TraceTier,
    pub timestamp: DateTime<Utc>,
    /// What was decided or attempted, e.g. "ask_question", "miss", "softened"
    pub action: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl TierResolution {
    pub fn new(tier: TraceTier, action: impl Into<String>, confidence: f32) -> Self {
        Self {
            tier,
            timestamp: Utc::now(),
            action: action.into(),
            confidence,
            source_id: None,
            reasoning: None,
        }
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

/// Caller contact details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Service address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// What the caller needs fixed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
}

/// When the caller wants service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_window: Option<String>,
}

/// Site access notes (gate codes, dogs, etc.)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Everything gathered from the caller so far, grouped by sub-object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedInfo {
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub location: ServiceLocation,
    #[serde(default)]
    pub problem: ProblemInfo,
    #[serde(default)]
    pub scheduling: SchedulingInfo,
    #[serde(default)]
    pub access: AccessInfo,
}

/// Partial update to `ExtractedInfo`, as produced by the orchestrator.
///
/// Merge semantics are monotonic: a field present in the patch wins, a
/// field absent from the patch preserves the existing value. A merge can
/// therefore never silently clear accumulated state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ServiceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<ProblemInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<SchedulingInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessInfo>,
}

impl ExtractedPatch {
    pub fn is_empty(&self) -> bool {
        self.contact.is_none()
            && self.location.is_none()
            && self.problem.is_none()
            && self.scheduling.is_none()
            && self.access.is_none()
    }
}

macro_rules! merge_field {
    ($dst:expr, $src:expr, $($field:ident),+) => {
        $(
            if $src.$field.is_some() {
                $dst.$field = $src.$field.clone();
            }
        )+
    };
}

impl ExtractedInfo {
    /// Apply a patch, sub-object by sub-object, new values winning field by
    /// field and absent fields preserved.
    pub fn merge(&mut self, patch: &ExtractedPatch) {
        if let Some(ref c) = patch.contact {
            merge_field!(self.contact, c, name, phone, email);
        }
        if let Some(ref l) = patch.location {
            merge_field!(
                self.location,
                l,
                address_line1,
                address_line2,
                city,
                state,
                postal_code
            );
        }
        if let Some(ref p) = patch.problem {
            merge_field!(self.problem, p, summary, category, urgency);
        }
        if let Some(ref s) = patch.scheduling {
            merge_field!(self.scheduling, s, preferred_date, preferred_window);
        }
        if let Some(ref a) = patch.access {
            merge_field!(self.access, a, notes);
        }
    }

    /// Booking-readiness checklist: all five must be present before
    /// `ready_to_book` may be honored.
    pub fn missing_booking_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.contact.name.is_none() {
            missing.push("contact name");
        }
        if self.contact.phone.is_none() {
            missing.push("contact phone");
        }
        if self.location.address_line1.is_none() {
            missing.push("service address");
        }
        if self.problem.summary.is_none() {
            missing.push("problem summary");
        }
        if self.scheduling.preferred_date.is_none() && self.scheduling.preferred_window.is_none() {
            missing.push("time preference");
        }
        missing
    }

    pub fn is_booking_ready(&self) -> bool {
        self.missing_booking_fields().is_empty()
    }

    /// Compact single-line summary for decision prompts
    pub fn to_prompt_summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref name) = self.contact.name {
            parts.push(format!("name={}", name));
        }
        if let Some(ref phone) = self.contact.phone {
            parts.push(format!("phone={}", phone));
        }
        if let Some(ref addr) = self.location.address_line1 {
            parts.push(format!("address={}", addr));
        }
        if let Some(ref city) = self.location.city {
            parts.push(format!("city={}", city));
        }
        if let Some(ref summary) = self.problem.summary {
            parts.push(format!("problem={}", summary));
        }
        if let Some(ref urgency) = self.problem.urgency {
            parts.push(format!("urgency={}", urgency));
        }
        if let Some(ref date) = self.scheduling.preferred_date {
            parts.push(format!("preferred_date={}", date));
        }
        if let Some(ref window) = self.scheduling.preferred_window {
            parts.push(format!("preferred_window={}", window));
        }
        if parts.is_empty() {
            "nothing captured yet".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Durable-but-ephemeral per-call state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallContext {
    pub call_id: String,
    pub company_id: String,
    pub trade: String,
    pub config_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_intent: Option<CallerIntent>,
    #[serde(default)]
    pub extracted: ExtractedInfo,
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,
    #[serde(default)]
    pub tier_trace: Vec<TierResolution>,
    #[serde(default)]
    pub ready_to_book: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallContext {
    pub fn new(
        call_id: impl Into<String>,
        company_id: impl Into<String>,
        trade: impl Into<String>,
        config_version: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            call_id: call_id.into(),
            company_id: company_id.into(),
            trade: trade.into(),
            config_version: config_version.into(),
            current_intent: None,
            extracted: ExtractedInfo::default(),
            transcript: Vec::new(),
            tier_trace: Vec::new(),
            ready_to_book: false,
            appointment_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Append one transcript line. The transcript is append-only.
    pub fn append_transcript(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.transcript.push(TranscriptEntry {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    /// Deep-merge extracted caller info (see `ExtractedInfo::merge`)
    pub fn merge_extracted(&mut self, patch: &ExtractedPatch) {
        self.extracted.merge(patch);
    }

    /// Append one audit entry. The trace is append-only.
    pub fn add_tier_resolution(&mut self, resolution: TierResolution) {
        self.tier_trace.push(resolution);
    }

    pub fn set_ready_to_book(&mut self, ready: bool) {
        self.ready_to_book = ready;
    }

    pub fn set_appointment_id(&mut self, id: Uuid) {
        self.appointment_id = Some(id);
    }

    /// Last few transcript lines for the decision prompt
    pub fn recent_transcript(&self, max_lines: usize) -> Vec<&TranscriptEntry> {
        let start = self.transcript.len().saturating_sub(max_lines);
        self.transcript[start..].iter().collect()
    }
}
