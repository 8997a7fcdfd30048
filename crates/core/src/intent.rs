//! Caller intent types
//!
//! The frontline classifier produces a `Classification` before the model is
//! consulted, so emergencies, spam and wrong numbers are visible even when
//! the LLM is down.

use serde::{Deserialize, Serialize};

/// Caller intent categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallerIntent {
    /// Caller wants a service visit scheduled
    Booking,
    /// Caller wants an existing appointment moved
    Reschedule,
    /// Caller wants an existing appointment cancelled
    Cancel,
    /// Factual question about services, hours, coverage area, etc.
    Question,
    /// Urgent hazard (gas leak, flooding, no heat in winter)
    Emergency,
    /// Caller did not mean to reach this business
    WrongNumber,
    /// Robocall / solicitation
    Spam,
    /// Greeting or chit-chat with no actionable content
    SmallTalk,
    /// Nothing recognizable yet
    #[default]
    Unknown,
}

impl CallerIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Reschedule => "reschedule",
            Self::Cancel => "cancel",
            Self::Question => "question",
            Self::Emergency => "emergency",
            Self::WrongNumber => "wrong_number",
            Self::Spam => "spam",
            Self::SmallTalk => "small_talk",
            Self::Unknown => "unknown",
        }
    }

    /// Loose parse accepting the snake_case wire form
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "booking" | "book" | "schedule" => Some(Self::Booking),
            "reschedule" => Some(Self::Reschedule),
            "cancel" | "cancellation" => Some(Self::Cancel),
            "question" | "faq" | "inquiry" => Some(Self::Question),
            "emergency" => Some(Self::Emergency),
            "wrong_number" | "wrong number" => Some(Self::WrongNumber),
            "spam" => Some(Self::Spam),
            "small_talk" | "smalltalk" | "greeting" => Some(Self::SmallTalk),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for CallerIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean side-channel signals from the frontline classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSignals {
    pub maybe_emergency: bool,
    pub maybe_wrong_number: bool,
    pub maybe_spam: bool,
}

/// Result of the frontline pass over one utterance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub intent: CallerIntent,
    /// Confidence in [0, 1]
    pub confidence: f32,
    pub signals: IntentSignals,
}

impl Classification {
    pub fn new(intent: CallerIntent, confidence: f32) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            signals: IntentSignals::default(),
        }
    }

    /// Whether this classification is allowed to overwrite the context's
    /// accumulated intent. Low-confidence noise and spam/wrong-number hits
    /// must never corrupt state that earlier turns built up.
    pub fn should_update_intent(&self) -> bool {
        self.confidence > 0.7
            && !matches!(self.intent, CallerIntent::Spam | CallerIntent::WrongNumber)
    }
}
