//! Turn orchestrator
//!
//! Builds the decision request, invokes the model once per turn under a
//! hard timeout, validates the reply, and falls back deterministically on
//! any protocol violation. The model is advisory; this module is the
//! authority on what reaches the caller.

mod fallback;
mod guardrails;
mod prompts;

pub use fallback::{fallback_decision, CLARIFY_PROMPT, EMERGENCY_PROMPT, FAREWELL_PROMPT};
pub use guardrails::{apply_guardrails, PRICE_ESCALATION_PROMPT};
pub use prompts::{decision_system_prompt, decision_user_prompt};

use std::sync::Arc;
use std::time::Duration;

use frontdesk_config::{CompanyRuntime, EngineSettings, LlmProviderSettings};
use frontdesk_core::{
    extract_json_object, CallContext, ChatModel, ChatRequest, Classification,
    OrchestratorDecision, RawDecision,
};

/// Result of one decision round
#[derive(Debug)]
pub struct DecisionOutcome {
    pub decision: OrchestratorDecision,
    /// True when the deterministic fallback produced the decision
    pub fell_back: bool,
    /// Tokens spent on the model call, zero on fallback
    pub tokens: usize,
}

/// One-per-engine decision maker
pub struct Orchestrator {
    model: Option<Arc<dyn ChatModel>>,
    decision_timeout: Duration,
    temperature: f32,
    max_tokens: usize,
    transcript_lines: usize,
}

impl Orchestrator {
    pub fn new(
        model: Option<Arc<dyn ChatModel>>,
        engine_settings: &EngineSettings,
        llm_settings: &LlmProviderSettings,
    ) -> Self {
        Self {
            model,
            decision_timeout: Duration::from_millis(engine_settings.decision_timeout_ms),
            temperature: llm_settings.temperature,
            max_tokens: llm_settings.max_tokens,
            transcript_lines: engine_settings.prompt_transcript_lines,
        }
    }

    /// Decide the agent's next move for this turn.
    pub async fn decide(
        &self,
        context: &CallContext,
        runtime: &CompanyRuntime,
        classification: &Classification,
        utterance: &str,
    ) -> DecisionOutcome {
        if !runtime.config.features.orchestrator_enabled {
            tracing::debug!(
                company_id = %runtime.config.company_id,
                "orchestrator disabled by feature flag"
            );
            return DecisionOutcome {
                decision: fallback_decision(classification),
                fell_back: true,
                tokens: 0,
            };
        }

        let Some(ref model) = self.model else {
            return DecisionOutcome {
                decision: fallback_decision(classification),
                fell_back: true,
                tokens: 0,
            };
        };

        let request = ChatRequest::new(
            decision_system_prompt(&runtime.config),
            decision_user_prompt(context, classification, utterance, self.transcript_lines),
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        let completion =
            match tokio::time::timeout(self.decision_timeout, model.complete(request)).await {
                Ok(Ok(completion)) => completion,
                Ok(Err(e)) => {
                    tracing::warn!(call_id = %context.call_id, error = %e, "decision call failed, falling back");
                    return DecisionOutcome {
                        decision: fallback_decision(classification),
                        fell_back: true,
                        tokens: 0,
                    };
                }
                Err(_) => {
                    tracing::warn!(call_id = %context.call_id, "decision call timed out, falling back");
                    return DecisionOutcome {
                        decision: fallback_decision(classification),
                        fell_back: true,
                        tokens: 0,
                    };
                }
            };

        match parse_decision(&completion.text) {
            Ok(decision) => {
                if runtime.config.features.debug_orchestrator {
                    tracing::debug!(
                        call_id = %context.call_id,
                        action = %decision.action,
                        debug_notes = ?decision.debug_notes,
                        "model decision accepted"
                    );
                }
                DecisionOutcome {
                    decision,
                    fell_back: false,
                    tokens: completion.tokens,
                }
            }
            Err(violation) => {
                tracing::warn!(
                    call_id = %context.call_id,
                    violation = %violation,
                    raw = %completion.text.chars().take(200).collect::<String>(),
                    "decision protocol violation, falling back"
                );
                DecisionOutcome {
                    decision: fallback_decision(classification),
                    fell_back: true,
                    tokens: completion.tokens,
                }
            }
        }
    }
}

/// Parse raw model text into a validated decision.
fn parse_decision(raw: &str) -> Result<OrchestratorDecision, String> {
    let json = extract_json_object(raw).ok_or_else(|| "no JSON object in reply".to_string())?;
    let raw_decision: RawDecision =
        serde_json::from_str(json).map_err(|e| format!("unparseable JSON: {}", e))?;
    raw_decision.validate().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use frontdesk_config::RuntimeConfig;
    use frontdesk_core::{AgentAction, CallerIntent, ChatCompletion, ChatError};

    struct ScriptedModel {
        reply: Result<String, ()>,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _request: ChatRequest) -> Result<ChatCompletion, ChatError> {
            match &self.reply {
                Ok(text) => Ok(ChatCompletion {
                    text: text.clone(),
                    tokens: 42,
                    latency_ms: 10,
                }),
                Err(()) => Err(ChatError::Unavailable("backend down".to_string())),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn orchestrator(model: Option<Arc<dyn ChatModel>>) -> Orchestrator {
        Orchestrator::new(
            model,
            &EngineSettings::default(),
            &LlmProviderSettings::default(),
        )
    }

    fn runtime() -> CompanyRuntime {
        CompanyRuntime::new(RuntimeConfig::fallback("co-1"))
    }

    fn context() -> CallContext {
        CallContext::new("call-1", "co-1", "hvac", "v1")
    }

    #[tokio::test]
    async fn test_valid_model_decision_accepted() {
        let model = Arc::new(ScriptedModel {
            reply: Ok(
                r#"{"action": "ask_question", "next_prompt": "What's the address?"}"#.to_string(),
            ),
        });
        let orch = orchestrator(Some(model));
        let c = Classification::new(CallerIntent::Booking, 0.8);

        let outcome = orch.decide(&context(), &runtime(), &c, "book me").await;
        assert!(!outcome.fell_back);
        assert_eq!(outcome.decision.action, AgentAction::AskQuestion);
        assert_eq!(outcome.tokens, 42);
    }

    #[tokio::test]
    async fn test_model_error_falls_back() {
        let model = Arc::new(ScriptedModel { reply: Err(()) });
        let orch = orchestrator(Some(model));
        let c = Classification::new(CallerIntent::WrongNumber, 0.9);

        let outcome = orch.decide(&context(), &runtime(), &c, "wrong number").await;
        assert!(outcome.fell_back);
        assert_eq!(outcome.decision.action, AgentAction::CloseCall);
    }

    #[tokio::test]
    async fn test_malformed_json_falls_back() {
        let model = Arc::new(ScriptedModel {
            reply: Ok("Sure! I'd say ask them a question next.".to_string()),
        });
        let orch = orchestrator(Some(model));
        let c = Classification::new(CallerIntent::Question, 0.8);

        let outcome = orch.decide(&context(), &runtime(), &c, "hours?").await;
        assert!(outcome.fell_back);
        assert_eq!(outcome.decision.action, AgentAction::ClarifyIntent);
    }

    #[tokio::test]
    async fn test_missing_action_falls_back() {
        let model = Arc::new(ScriptedModel {
            reply: Ok(r#"{"next_prompt": "hi there"}"#.to_string()),
        });
        let orch = orchestrator(Some(model));
        let c = Classification::new(CallerIntent::Unknown, 0.3);

        let outcome = orch.decide(&context(), &runtime(), &c, "eh").await;
        assert!(outcome.fell_back);
    }

    #[tokio::test]
    async fn test_no_model_falls_back() {
        let orch = orchestrator(None);
        let c = Classification::new(CallerIntent::Emergency, 0.9);

        let outcome = orch.decide(&context(), &runtime(), &c, "gas leak!").await;
        assert!(outcome.fell_back);
        assert_eq!(outcome.decision.action, AgentAction::AskQuestion);
    }

    #[tokio::test]
    async fn test_feature_flag_disables_model() {
        let model = Arc::new(ScriptedModel {
            reply: Ok(r#"{"action": "small_talk", "next_prompt": "hey"}"#.to_string()),
        });
        let mut config = RuntimeConfig::fallback("co-1");
        config.features.orchestrator_enabled = false;
        let runtime = CompanyRuntime::new(config);

        let orch = orchestrator(Some(model));
        let c = Classification::new(CallerIntent::SmallTalk, 0.75);

        let outcome = orch.decide(&context(), &runtime, &c, "hello").await;
        assert!(outcome.fell_back);
    }

    #[test]
    fn test_parse_decision_with_fences() {
        let decision = parse_decision(
            "```json\n{\"action\": \"confirm_info\", \"next_prompt\": \"So that's 12 Elm St?\"}\n```",
        )
        .unwrap();
        assert_eq!(decision.action, AgentAction::ConfirmInfo);
    }
}
