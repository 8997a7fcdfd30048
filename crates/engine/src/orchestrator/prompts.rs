//! Decision prompt construction
//!
//! The system prompt pins the closed action vocabulary, the booking
//! readiness checklist, and the strict JSON response shape; the user
//! prompt carries everything turn-specific.

use frontdesk_config::RuntimeConfig;
use frontdesk_core::{AgentAction, CallContext, Classification, Speaker};

pub fn decision_system_prompt(config: &RuntimeConfig) -> String {
    let actions = AgentAction::ALL
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = format!(
        "You are the decision engine for a phone receptionist at a {} company. \
Each turn you read the call state and the caller's latest utterance, then decide \
the agent's next move.\n\n\
Allowed actions (pick exactly one): {}.\n\n\
Booking readiness: ready_to_book may only be true once ALL FIVE are captured: \
contact name, contact phone, service address, problem summary, time preference.\n\n\
Never state prices, arrival times, or capabilities you were not given. When the \
caller asks a factual question you cannot answer from the state below, set \
needs_knowledge_search to true and put their question in knowledge_query.\n\n\
Respond with ONLY one JSON object, no prose:\n\
{{\"action\": \"<action>\", \"next_prompt\": \"<what the agent says next>\", \
\"updated_intent\": \"<intent or omit>\", \
\"updates\": {{\"extracted\": {{\"contact\": {{...}}, \"location\": {{...}}, \
\"problem\": {{...}}, \"scheduling\": {{...}}, \"access\": {{...}}}}, \
\"flags\": {{\"ready_to_book\": <bool>}}}}, \
\"knowledge_query\": \"<question or omit>\", \
\"needs_knowledge_search\": <bool>, \"debug_notes\": \"<optional>\"}}",
        if config.trade.is_empty() {
            "home services"
        } else {
            config.trade.as_str()
        },
        actions,
    );

    if let Some(greeting) = config.variable("greeting") {
        prompt.push_str(&format!("\n\nCompany greeting: {}", greeting));
    }
    if let Some(hours) = config.variable("hours") {
        prompt.push_str(&format!("\nBusiness hours: {}", hours));
    }

    prompt
}

pub fn decision_user_prompt(
    context: &CallContext,
    classification: &Classification,
    utterance: &str,
    transcript_lines: usize,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Call state:\n- intent so far: {}\n- extracted: {}\n",
        context
            .current_intent
            .map(|i| i.as_str())
            .unwrap_or("none"),
        context.extracted.to_prompt_summary(),
    ));

    let missing = context.extracted.missing_booking_fields();
    if missing.is_empty() {
        prompt.push_str("- booking checklist: complete\n");
    } else {
        prompt.push_str(&format!("- still missing for booking: {}\n", missing.join(", ")));
    }

    prompt.push_str(&format!(
        "- frontline classifier: {} (confidence {:.2}, emergency={}, wrong_number={}, spam={})\n",
        classification.intent,
        classification.confidence,
        classification.signals.maybe_emergency,
        classification.signals.maybe_wrong_number,
        classification.signals.maybe_spam,
    ));

    let recent = context.recent_transcript(transcript_lines);
    if !recent.is_empty() {
        prompt.push_str("\nRecent transcript:\n");
        for entry in recent {
            let who = match entry.speaker {
                Speaker::Caller => "caller",
                Speaker::Agent => "agent",
            };
            prompt.push_str(&format!("{}: {}\n", who, entry.text));
        }
    }

    prompt.push_str(&format!("\nCaller just said: {}", utterance));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontdesk_core::CallerIntent;

    #[test]
    fn test_system_prompt_lists_all_actions() {
        let prompt = decision_system_prompt(&RuntimeConfig::fallback("co-1"));
        for action in AgentAction::ALL {
            assert!(prompt.contains(action.as_str()), "missing {}", action);
        }
    }

    #[test]
    fn test_system_prompt_includes_variables() {
        let mut config = RuntimeConfig::fallback("co-1");
        config
            .variables
            .insert("hours".to_string(), "Mon-Fri 7-6".to_string());
        let prompt = decision_system_prompt(&config);
        assert!(prompt.contains("Mon-Fri 7-6"));
    }

    #[test]
    fn test_user_prompt_flags_missing_checklist() {
        let ctx = CallContext::new("call-1", "co-1", "hvac", "v1");
        let classification = Classification::new(CallerIntent::Booking, 0.8);
        let prompt = decision_user_prompt(&ctx, &classification, "book me in", 8);

        assert!(prompt.contains("still missing for booking"));
        assert!(prompt.contains("contact name"));
        assert!(prompt.contains("Caller just said: book me in"));
    }

    #[test]
    fn test_user_prompt_includes_transcript() {
        let mut ctx = CallContext::new("call-1", "co-1", "hvac", "v1");
        ctx.append_transcript(Speaker::Caller, "my ac died");
        ctx.append_transcript(Speaker::Agent, "sorry to hear that");
        let classification = Classification::new(CallerIntent::Booking, 0.8);

        let prompt = decision_user_prompt(&ctx, &classification, "can you come out", 8);
        assert!(prompt.contains("caller: my ac died"));
        assert!(prompt.contains("agent: sorry to hear that"));
    }
}
