//! Tier 3: LLM synthesis against the knowledge base
//!
//! Last resort. The model is given the company's knowledge documents and
//! must answer from them alone, reporting its own confidence; the resolver
//! and engine gate on that confidence before anything reaches the caller.

use serde::Deserialize;

use frontdesk_config::KnowledgeDoc;
use frontdesk_core::{extract_json_object, ChatModel, ChatRequest};

use crate::KnowledgeError;

const SYNTHESIS_SYSTEM_PROMPT: &str = "You answer questions for a home-services \
business using ONLY the provided knowledge documents. If the documents do not \
contain the answer, say so and report low confidence. Respond with a single JSON \
object: {\"answer\": \"<answer text>\", \"confidence\": <0.0-1.0>}. No other text.";

/// Model's reply shape
#[derive(Debug, Deserialize)]
struct SynthesisReply {
    answer: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// A synthesized answer with self-reported confidence
#[derive(Debug, Clone)]
pub struct SynthesizedAnswer {
    pub text: String,
    pub confidence: f32,
    pub tokens: usize,
}

/// LLM-backed free-form synthesis
pub struct LlmSynthesis<'a> {
    model: &'a dyn ChatModel,
}

impl<'a> LlmSynthesis<'a> {
    pub fn new(model: &'a dyn ChatModel) -> Self {
        Self { model }
    }

    pub async fn synthesize(
        &self,
        query: &str,
        docs: &[KnowledgeDoc],
    ) -> Result<SynthesizedAnswer, KnowledgeError> {
        let mut user_prompt = String::new();
        if docs.is_empty() {
            user_prompt.push_str("Knowledge documents: (none on file)\n");
        } else {
            user_prompt.push_str("Knowledge documents:\n");
            for doc in docs {
                user_prompt.push_str(&format!("## {} ({})\n{}\n\n", doc.title, doc.id, doc.body));
            }
        }
        user_prompt.push_str(&format!("Question: {}", query));

        let request = ChatRequest::new(SYNTHESIS_SYSTEM_PROMPT, user_prompt)
            .with_temperature(0.1)
            .with_max_tokens(256);

        let completion = self.model.complete(request).await?;

        let json = extract_json_object(&completion.text).ok_or_else(|| {
            KnowledgeError::UnusableOutput(format!(
                "no JSON object in synthesis reply: {}",
                completion.text.chars().take(120).collect::<String>()
            ))
        })?;

        let reply: SynthesisReply = serde_json::from_str(json)
            .map_err(|e| KnowledgeError::UnusableOutput(e.to_string()))?;

        let confidence = reply.confidence.unwrap_or(0.0).clamp(0.0, 1.0);

        tracing::debug!(
            confidence,
            tokens = completion.tokens,
            "synthesis answer produced"
        );

        Ok(SynthesizedAnswer {
            text: reply.answer,
            confidence,
            tokens: completion.tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use frontdesk_core::{ChatCompletion, ChatError};

    struct ScriptedModel {
        reply: String,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _request: ChatRequest) -> Result<ChatCompletion, ChatError> {
            Ok(ChatCompletion {
                text: self.reply.clone(),
                tokens: 20,
                latency_ms: 5,
            })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn docs() -> Vec<KnowledgeDoc> {
        vec![KnowledgeDoc {
            id: "doc-1".to_string(),
            title: "Service area".to_string(),
            body: "We cover the Phoenix metro area including Tempe and Mesa.".to_string(),
        }]
    }

    #[tokio::test]
    async fn test_synthesize_parses_reply() {
        let model = ScriptedModel {
            reply: r#"{"answer": "Yes, Tempe is in our service area.", "confidence": 0.85}"#
                .to_string(),
        };
        let synthesis = LlmSynthesis::new(&model);

        let answer = synthesis.synthesize("do you cover tempe", &docs()).await.unwrap();
        assert_eq!(answer.confidence, 0.85);
        assert!(answer.text.contains("Tempe"));
    }

    #[tokio::test]
    async fn test_synthesize_tolerates_fences() {
        let model = ScriptedModel {
            reply: "```json\n{\"answer\": \"We cover Mesa.\", \"confidence\": 0.7}\n```".to_string(),
        };
        let synthesis = LlmSynthesis::new(&model);

        let answer = synthesis.synthesize("mesa?", &docs()).await.unwrap();
        assert_eq!(answer.confidence, 0.7);
    }

    #[tokio::test]
    async fn test_missing_confidence_treated_as_zero() {
        let model = ScriptedModel {
            reply: r#"{"answer": "maybe"}"#.to_string(),
        };
        let synthesis = LlmSynthesis::new(&model);

        let answer = synthesis.synthesize("q", &docs()).await.unwrap();
        assert_eq!(answer.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_non_json_reply_is_error() {
        let model = ScriptedModel {
            reply: "I'm not sure what you mean.".to_string(),
        };
        let synthesis = LlmSynthesis::new(&model);

        assert!(synthesis.synthesize("q", &docs()).await.is_err());
    }
}
