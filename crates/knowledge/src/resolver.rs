//! The cost-ordered resolution waterfall

use std::sync::Arc;

use frontdesk_config::{KnowledgeDoc, RuntimeConfig, TierThresholds};
use frontdesk_core::{ChatModel, TierResolution};

use crate::scenarios::ScenarioMatcher;
use crate::semantic::SemanticIndex;
use crate::synthesis::LlmSynthesis;
use crate::{KnowledgeError, KnowledgeTier, ResolvedAnswer};

/// Outcome of one resolver invocation
#[derive(Debug)]
pub struct ResolutionOutcome {
    /// Best answer found, at whatever confidence; `None` when every cheap
    /// tier missed and no synthesis backend exists. Authoritativeness
    /// gating is the engine's job.
    pub answer: Option<ResolvedAnswer>,
    /// One audit entry per tier attempted, hit or miss
    pub trace: Vec<TierResolution>,
    /// Tokens spent on synthesis, for usage accounting
    pub tokens: usize,
}

/// Waterfall over the three knowledge tiers for one company.
///
/// Built once per `(company, config_version)` and cached by the engine;
/// the scenario matcher and semantic index precompute at construction.
pub struct TieredResolver {
    scenarios: ScenarioMatcher,
    semantic: SemanticIndex,
    docs: Vec<KnowledgeDoc>,
    thresholds: TierThresholds,
    model: Option<Arc<dyn ChatModel>>,
}

impl TieredResolver {
    pub fn for_company(config: &RuntimeConfig, model: Option<Arc<dyn ChatModel>>) -> Self {
        Self {
            scenarios: ScenarioMatcher::new(&config.scenarios),
            semantic: SemanticIndex::build(&config.qa_pairs),
            docs: config.knowledge_docs.clone(),
            thresholds: config.thresholds.clone(),
            model,
        }
    }

    /// Walk the tiers cheapest-first, stopping at the first confident hit.
    pub async fn resolve(&self, query: &str) -> Result<ResolutionOutcome, KnowledgeError> {
        let mut trace = Vec::new();

        // Tier 1: scenario catalog
        if !self.scenarios.is_empty() {
            match self.scenarios.best_match(query) {
                Some(hit) if hit.confidence >= self.thresholds.tier1_min => {
                    trace.push(
                        TierResolution::new(KnowledgeTier::Keyword.trace_tier(), "hit", hit.confidence)
                            .with_source(hit.id),
                    );
                    return Ok(ResolutionOutcome {
                        answer: Some(ResolvedAnswer {
                            tier: KnowledgeTier::Keyword,
                            confidence: hit.confidence,
                            factual_text: hit.answer.to_string(),
                            source_id: Some(hit.id.to_string()),
                            cost: 0.0,
                        }),
                        trace,
                        tokens: 0,
                    });
                }
                Some(hit) => {
                    trace.push(
                        TierResolution::new(KnowledgeTier::Keyword.trace_tier(), "miss", hit.confidence)
                            .with_reasoning("below tier threshold"),
                    );
                }
                None => {
                    trace.push(TierResolution::new(
                        KnowledgeTier::Keyword.trace_tier(),
                        "miss",
                        0.0,
                    ));
                }
            }
        }

        // Tier 2: curated Q&A corpus
        if !self.semantic.is_empty() {
            match self.semantic.best_match(query) {
                Some(hit) if hit.score >= self.thresholds.tier2_min => {
                    trace.push(
                        TierResolution::new(KnowledgeTier::Semantic.trace_tier(), "hit", hit.score)
                            .with_source(hit.id),
                    );
                    return Ok(ResolutionOutcome {
                        answer: Some(ResolvedAnswer {
                            tier: KnowledgeTier::Semantic,
                            confidence: hit.score,
                            factual_text: hit.answer.to_string(),
                            source_id: Some(hit.id.to_string()),
                            cost: self.thresholds.tier2_cost,
                        }),
                        trace,
                        tokens: 0,
                    });
                }
                Some(hit) => {
                    trace.push(
                        TierResolution::new(KnowledgeTier::Semantic.trace_tier(), "miss", hit.score)
                            .with_reasoning("below tier threshold"),
                    );
                }
                None => {}
            }
        }

        // Tier 3: LLM synthesis, last resort
        let Some(ref model) = self.model else {
            tracing::debug!(query, "no synthesis backend, resolution exhausted");
            return Ok(ResolutionOutcome {
                answer: None,
                trace,
                tokens: 0,
            });
        };

        let synthesized = LlmSynthesis::new(model.as_ref())
            .synthesize(query, &self.docs)
            .await?;

        trace.push(
            TierResolution::new(
                KnowledgeTier::Synthesis.trace_tier(),
                if synthesized.confidence >= self.thresholds.authoritative_min {
                    "hit"
                } else {
                    "low_confidence"
                },
                synthesized.confidence,
            )
            .with_reasoning("synthesized from knowledge base"),
        );

        Ok(ResolutionOutcome {
            answer: Some(ResolvedAnswer {
                tier: KnowledgeTier::Synthesis,
                confidence: synthesized.confidence,
                factual_text: synthesized.text,
                source_id: None,
                cost: self.thresholds.tier3_cost,
            }),
            trace,
            tokens: synthesized.tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use frontdesk_config::{QaPair, Scenario};
    use frontdesk_core::{ChatCompletion, ChatError, ChatRequest, TraceTier};

    struct ScriptedModel {
        reply: String,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _request: ChatRequest) -> Result<ChatCompletion, ChatError> {
            Ok(ChatCompletion {
                text: self.reply.clone(),
                tokens: 30,
                latency_ms: 4,
            })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn config() -> RuntimeConfig {
        let mut config = RuntimeConfig::fallback("co-1");
        config.scenarios = vec![Scenario {
            id: "no-cool".to_string(),
            keywords: vec!["warm air".to_string(), "not cooling".to_string()],
            answer: "Warm air usually means a refrigerant or capacitor issue.".to_string(),
            category: None,
        }];
        config.qa_pairs = vec![QaPair {
            id: "qa-warranty".to_string(),
            question: "Do repairs come with a warranty?".to_string(),
            answer: "All repairs carry a one-year warranty.".to_string(),
        }];
        config.knowledge_docs = vec![KnowledgeDoc {
            id: "doc-1".to_string(),
            title: "Coverage".to_string(),
            body: "We cover the Phoenix metro area.".to_string(),
        }];
        config
    }

    #[tokio::test]
    async fn test_tier1_hit_stops_waterfall() {
        let resolver = TieredResolver::for_company(&config(), None);
        let outcome = resolver.resolve("the vents blow warm air").await.unwrap();

        let answer = outcome.answer.unwrap();
        assert_eq!(answer.tier, KnowledgeTier::Keyword);
        assert_eq!(answer.cost, 0.0);
        assert_eq!(outcome.trace.len(), 1);
        assert_eq!(outcome.trace[0].tier, TraceTier::Keyword);
        assert_eq!(outcome.trace[0].action, "hit");
    }

    #[tokio::test]
    async fn test_tier2_hit_after_tier1_miss() {
        let resolver = TieredResolver::for_company(&config(), None);
        let outcome = resolver
            .resolve("do repairs come with a warranty")
            .await
            .unwrap();

        let answer = outcome.answer.unwrap();
        assert_eq!(answer.tier, KnowledgeTier::Semantic);
        assert_eq!(answer.source_id.as_deref(), Some("qa-warranty"));
        // Tier 1 recorded its miss
        assert_eq!(outcome.trace[0].tier, TraceTier::Keyword);
        assert_eq!(outcome.trace[0].action, "miss");
    }

    #[tokio::test]
    async fn test_no_model_means_no_tier3() {
        let resolver = TieredResolver::for_company(&config(), None);
        let outcome = resolver.resolve("something entirely unrelated").await.unwrap();
        assert!(outcome.answer.is_none());
    }

    #[tokio::test]
    async fn test_tier3_runs_when_cheap_tiers_miss() {
        let model = Arc::new(ScriptedModel {
            reply: r#"{"answer": "Yes, Phoenix metro is covered.", "confidence": 0.8}"#.to_string(),
        });
        let resolver = TieredResolver::for_company(&config(), Some(model));
        let outcome = resolver.resolve("is phoenix covered by you").await.unwrap();

        let answer = outcome.answer.unwrap();
        assert_eq!(answer.tier, KnowledgeTier::Synthesis);
        assert_eq!(answer.confidence, 0.8);
        assert!(outcome.tokens > 0);
        assert_eq!(outcome.trace.last().unwrap().tier, TraceTier::Synthesis);
    }

    #[tokio::test]
    async fn test_tier3_low_confidence_still_returned() {
        let model = Arc::new(ScriptedModel {
            reply: r#"{"answer": "I am not sure.", "confidence": 0.3}"#.to_string(),
        });
        let resolver = TieredResolver::for_company(&config(), Some(model));
        let outcome = resolver.resolve("question with no good answer").await.unwrap();

        // The engine gates on confidence; the resolver reports what it found.
        let answer = outcome.answer.unwrap();
        assert_eq!(answer.confidence, 0.3);
        assert_eq!(outcome.trace.last().unwrap().action, "low_confidence");
    }
}
