//! Deterministic fallback decisions
//!
//! Used whenever the model is unavailable, times out, or violates the
//! decision protocol. Keyed off the frontline classifier so the
//! conversation always advances, whatever state the backend is in.

use frontdesk_core::{AgentAction, CallerIntent, Classification, OrchestratorDecision};

pub const FAREWELL_PROMPT: &str = "Thank you for your call. Have a great day!";

pub const EMERGENCY_PROMPT: &str = "I understand this may be an emergency. Can you \
give me the service address and the best callback number so we can get someone \
moving right away?";

pub const CLARIFY_PROMPT: &str = "I'm sorry, could you tell me a little more about \
what you need help with today?";

/// Build a safe decision from the classifier result alone.
pub fn fallback_decision(classification: &Classification) -> OrchestratorDecision {
    match classification.intent {
        CallerIntent::WrongNumber | CallerIntent::Spam => {
            OrchestratorDecision::new(AgentAction::CloseCall, FAREWELL_PROMPT)
        }
        CallerIntent::Emergency => {
            OrchestratorDecision::new(AgentAction::AskQuestion, EMERGENCY_PROMPT)
        }
        _ if classification.signals.maybe_emergency => {
            OrchestratorDecision::new(AgentAction::AskQuestion, EMERGENCY_PROMPT)
        }
        _ => OrchestratorDecision::new(AgentAction::ClarifyIntent, CLARIFY_PROMPT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_number_closes_call() {
        let c = Classification::new(CallerIntent::WrongNumber, 0.9);
        let decision = fallback_decision(&c);
        assert_eq!(decision.action, AgentAction::CloseCall);
        assert_eq!(decision.next_prompt, "Thank you for your call. Have a great day!");
    }

    #[test]
    fn test_spam_closes_call() {
        let c = Classification::new(CallerIntent::Spam, 0.85);
        assert_eq!(fallback_decision(&c).action, AgentAction::CloseCall);
    }

    #[test]
    fn test_emergency_asks_for_dispatch_essentials() {
        let c = Classification::new(CallerIntent::Emergency, 0.9);
        let decision = fallback_decision(&c);
        assert_eq!(decision.action, AgentAction::AskQuestion);
        assert!(decision.next_prompt.contains("address"));
        assert!(decision.next_prompt.contains("callback"));
    }

    #[test]
    fn test_emergency_signal_overrides_other_intent() {
        let mut c = Classification::new(CallerIntent::Question, 0.6);
        c.signals.maybe_emergency = true;
        assert_eq!(fallback_decision(&c).action, AgentAction::AskQuestion);
    }

    #[test]
    fn test_everything_else_clarifies() {
        for intent in [
            CallerIntent::Booking,
            CallerIntent::Question,
            CallerIntent::SmallTalk,
            CallerIntent::Unknown,
        ] {
            let c = Classification::new(intent, 0.5);
            let decision = fallback_decision(&c);
            assert_eq!(decision.action, AgentAction::ClarifyIntent);
            assert!(!decision.next_prompt.is_empty());
        }
    }
}
