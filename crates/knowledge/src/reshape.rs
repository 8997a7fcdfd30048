//! Fact reshaping
//!
//! A narrowly-scoped second model call that turns a terse verified fact
//! into natural voice phrasing, constrained to introduce nothing absent
//! from the source text. When it fails (timeout, backend down, empty
//! output) the raw fact is used verbatim. Correctness over fluency.

use frontdesk_core::{ChatModel, ChatRequest};

const RESHAPE_SYSTEM_PROMPT: &str = "You rephrase a verified fact as one or two \
short, natural spoken sentences for a phone receptionist. You MUST NOT add any \
information, numbers, promises, or qualifiers that are not in the fact text. \
Reply with the rephrased sentence only.";

/// Reshapes verified facts for voice delivery
pub struct FactReshaper<'a> {
    model: &'a dyn ChatModel,
}

/// Result of a reshape attempt
#[derive(Debug, Clone)]
pub struct ReshapedFact {
    pub text: String,
    /// False when the verbatim fallback was used
    pub reshaped: bool,
    pub tokens: usize,
}

impl<'a> FactReshaper<'a> {
    pub fn new(model: &'a dyn ChatModel) -> Self {
        Self { model }
    }

    /// Rephrase `fact` in the context of the caller's question. Never
    /// fails: any error path returns the fact verbatim.
    pub async fn reshape(&self, fact: &str, query: &str) -> ReshapedFact {
        let user_prompt = format!("Caller asked: {}\nVerified fact: {}", query, fact);
        let request = ChatRequest::new(RESHAPE_SYSTEM_PROMPT, user_prompt)
            .with_temperature(0.3)
            .with_max_tokens(128);

        match self.model.complete(request).await {
            Ok(completion) => {
                let text = completion.text.trim().to_string();
                if text.is_empty() {
                    tracing::debug!("reshape returned empty text, using fact verbatim");
                    ReshapedFact {
                        text: fact.to_string(),
                        reshaped: false,
                        tokens: completion.tokens,
                    }
                } else {
                    ReshapedFact {
                        text,
                        reshaped: true,
                        tokens: completion.tokens,
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "reshape call failed, using fact verbatim");
                ReshapedFact {
                    text: fact.to_string(),
                    reshaped: false,
                    tokens: 0,
                }
            }
        }
    }
}
