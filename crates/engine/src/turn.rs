//! The per-turn engine and its public entry points
//!
//! `process_caller_turn` is the single entry point other layers call once
//! per utterance. Its contract: always return a valid reply. Internal
//! errors degrade along the taxonomy in the crate root; a top-level catch
//! converts anything unexpected into a safe generic clarifying reply.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use frontdesk_config::{CompanyRuntime, ConfigProvider, RuntimeConfig, Settings};
use frontdesk_core::{
    AgentAction, CallContext, ChatModel, OrchestratorDecision, Speaker, TierResolution, TraceTier,
    UsageData,
};
use frontdesk_knowledge::{FactReshaper, ResolutionOutcome, TieredResolver};
use frontdesk_persistence::{CallRecord, PersistenceLayer};
use frontdesk_store::ContextStore;

use crate::booking::AppointmentMaterializer;
use crate::classifier::classify;
use crate::orchestrator::{apply_guardrails, Orchestrator, CLARIFY_PROMPT};
use crate::trace::{TraceRecorder, TraceSink, TurnTrace};
use crate::EngineError;

const LOW_CONFIDENCE_PROMPT: &str = "I want to make sure I give you accurate \
information and I'm not certain about that one. Could you rephrase the question, \
or is there something else I can help with?";

const KNOWLEDGE_ESCALATION_PROMPT: &str = "That's a good question and I want to \
get you a reliable answer. Let me have a team member follow up - what's the best \
number to reach you?";

const BOOKING_ESCALATION_PROMPT: &str = "I'm having trouble getting that on the \
schedule from my end. Let me have a team member call you right back to lock in \
the appointment - is this the best number for you?";

/// What a turn returns to the transport layer
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub next_prompt: String,
    pub decision: OrchestratorDecision,
}

/// The per-turn call orchestration engine.
///
/// Stateless per request: all cross-turn state lives in the context store,
/// never in process memory, because successive turns of one call may be
/// served by different process instances. Turns for a single call are
/// assumed to arrive strictly sequentially; no lock is taken on the
/// context key.
pub struct TurnEngine {
    store: Arc<dyn ContextStore>,
    configs: Arc<dyn ConfigProvider>,
    model: Option<Arc<dyn ChatModel>>,
    persistence: PersistenceLayer,
    orchestrator: Orchestrator,
    materializer: AppointmentMaterializer,
    trace: TraceRecorder,
    knowledge_timeout: Duration,
    /// Per-company resolvers, keyed by `company_id:config_version`
    resolvers: DashMap<String, Arc<TieredResolver>>,
    /// Per-call usage accumulation until finalization
    usage: DashMap<String, UsageData>,
}

impl TurnEngine {
    pub fn new(
        settings: &Settings,
        store: Arc<dyn ContextStore>,
        configs: Arc<dyn ConfigProvider>,
        model: Option<Arc<dyn ChatModel>>,
        persistence: PersistenceLayer,
        sink: Arc<dyn TraceSink>,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(model.clone(), &settings.engine, &settings.llm),
            materializer: AppointmentMaterializer::new(persistence.clone()),
            trace: TraceRecorder::new(sink),
            knowledge_timeout: Duration::from_millis(settings.engine.knowledge_timeout_ms),
            resolvers: DashMap::new(),
            usage: DashMap::new(),
            store,
            configs,
            model,
            persistence,
        }
    }

    /// Process one utterance. Always returns a valid reply.
    pub async fn process_caller_turn(
        &self,
        company_id: &str,
        call_id: &str,
        speaker: Speaker,
        text: &str,
    ) -> TurnReply {
        let started = Instant::now();
        match self
            .process_inner(company_id, call_id, speaker, text, started)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    company_id,
                    call_id,
                    error = %e,
                    "turn processing failed, returning emergency generic reply"
                );
                metrics::counter!("frontdesk_turn_errors_total").increment(1);
                TurnReply {
                    next_prompt: CLARIFY_PROMPT.to_string(),
                    decision: OrchestratorDecision::new(AgentAction::ClarifyIntent, CLARIFY_PROMPT),
                }
            }
        }
    }

    /// Lifecycle bracket: create the call's context at call start.
    pub async fn init_call_context(
        &self,
        call_id: &str,
        company_id: &str,
        trade: &str,
        config_version: &str,
    ) -> Result<CallContext, EngineError> {
        self.store
            .init(call_id, company_id, trade, config_version)
            .await
            .map_err(|e| EngineError::ContextUnavailable(e.to_string()))
    }

    /// Lifecycle bracket: archive the call durably, then delete the live
    /// context. The context is never deleted if the archive write fails.
    pub async fn finalize_call(
        &self,
        call_id: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        usage: UsageData,
    ) -> Result<(), EngineError> {
        let mut total = self
            .usage
            .remove(call_id)
            .map(|(_, u)| u)
            .unwrap_or_default();
        total.merge(&usage);

        let context = match self.store.load(call_id).await {
            Ok(Some(ctx)) => ctx,
            Ok(None) => {
                tracing::warn!(call_id, "finalize found no context, recording usage only");
                self.trace.record_usage(call_id, total);
                return Ok(());
            }
            Err(e) => return Err(EngineError::ContextUnavailable(e.to_string())),
        };

        let record = CallRecord {
            call_id: call_id.to_string(),
            company_id: context.company_id.clone(),
            started_at,
            ended_at,
            transcript: context.transcript.clone(),
            tier_trace: context.tier_trace.clone(),
            appointment_id: context.appointment_id,
            usage: total.clone(),
            archived_at: Utc::now(),
        };

        self.persistence
            .call_records
            .archive(&record)
            .await
            .map_err(|e| EngineError::ArchiveFailed(e.to_string()))?;

        if let Err(e) = self.store.delete(call_id).await {
            tracing::warn!(call_id, error = %e, "context delete after archive failed");
        }

        self.trace.record_usage(call_id, total);
        Ok(())
    }

    async fn process_inner(
        &self,
        company_id: &str,
        call_id: &str,
        speaker: Speaker,
        text: &str,
        started: Instant,
    ) -> Result<TurnReply, EngineError> {
        let runtime = self.company_runtime(company_id);
        let mut context = self.load_or_reinit(call_id, company_id, &runtime).await;
        let mut turn_usage = UsageData::default();

        // Agent-side lines only extend the transcript; decisions are made
        // on caller turns.
        if speaker == Speaker::Agent {
            context.append_transcript(Speaker::Agent, text);
            self.save_soft(&mut context).await;
            let decision = OrchestratorDecision::new(AgentAction::NoOp, text);
            return Ok(TurnReply {
                next_prompt: decision.next_prompt.clone(),
                decision,
            });
        }

        // Frontline pass: cheap, synchronous, runs before the model.
        let cleaned = runtime.lexicon.clean(text);
        let classification = classify(&cleaned, &runtime.lexicon, Some(&context));
        context.add_tier_resolution(TierResolution::new(
            TraceTier::Frontline,
            classification.intent.as_str(),
            classification.confidence,
        ));
        if classification.should_update_intent() {
            context.current_intent = Some(classification.intent);
        }

        context.append_transcript(Speaker::Caller, text);

        // One model decision per turn, or the deterministic fallback.
        let outcome = self
            .orchestrator
            .decide(&context, &runtime, &classification, text)
            .await;
        let mut decision = outcome.decision;
        if outcome.tokens > 0 {
            turn_usage.record_llm_call(outcome.tokens);
        }
        if outcome.fell_back {
            turn_usage.fallback_decisions += 1;
        }
        context.add_tier_resolution(TierResolution::new(
            if outcome.fell_back {
                TraceTier::Fallback
            } else {
                TraceTier::Orchestrator
            },
            decision.action.as_str(),
            if outcome.fell_back {
                classification.confidence
            } else {
                1.0
            },
        ));

        if let Some(intent) = decision.updated_intent {
            context.current_intent = Some(intent);
        }

        // Deterministic post-filter over whatever the model said.
        let (guarded, guard_entries) = apply_guardrails(decision, &runtime.config);
        decision = guarded;
        turn_usage.guardrail_triggers += guard_entries.len() as u32;
        for entry in guard_entries {
            context.add_tier_resolution(entry);
        }

        // Knowledge waterfall, only when the decision asks for it and the
        // guardrails didn't already terminate the exchange.
        let mut knowledge_tier = None;
        if !decision.action.is_terminal() && decision.wants_knowledge() {
            let query = decision
                .knowledge_query
                .clone()
                .unwrap_or_default();

            match self.resolve_knowledge(&runtime, &query).await {
                Ok(resolution) => {
                    if resolution.tokens > 0 {
                        turn_usage.record_llm_call(resolution.tokens);
                    }
                    for entry in resolution.trace {
                        context.add_tier_resolution(entry);
                    }

                    match resolution.answer {
                        Some(answer)
                            if answer.confidence
                                >= runtime.config.thresholds.authoritative_min =>
                        {
                            knowledge_tier = Some(answer.tier.number());
                            turn_usage.record_tier_hit(answer.tier.number(), answer.cost);

                            decision.action = AgentAction::AnswerWithKnowledge;
                            decision.next_prompt =
                                self.phrase_fact(&mut context, &answer.factual_text, &query, &mut turn_usage).await;
                        }
                        Some(answer) => {
                            // Below the authoritative gate: a guess must
                            // never be presented as fact.
                            turn_usage.record_tier_hit(answer.tier.number(), answer.cost);
                            tracing::debug!(
                                call_id,
                                confidence = answer.confidence,
                                "knowledge result below authoritative threshold, clarifying"
                            );
                            decision.action = AgentAction::ClarifyIntent;
                            decision.next_prompt = LOW_CONFIDENCE_PROMPT.to_string();
                        }
                        None => {
                            decision.action = AgentAction::ClarifyIntent;
                            decision.next_prompt = LOW_CONFIDENCE_PROMPT.to_string();
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(call_id, error = %e, "knowledge lookup failed, escalating");
                    context.add_tier_resolution(
                        TierResolution::new(TraceTier::Synthesis, "failed", 0.0)
                            .with_reasoning(e.to_string()),
                    );
                    decision.action = AgentAction::EscalateToHuman;
                    decision.next_prompt = KNOWLEDGE_ESCALATION_PROMPT.to_string();
                }
            }
        }

        // Merge extracted state; absent fields are preserved.
        if let Some(ref patch) = decision.updates.extracted {
            context.merge_extracted(patch);
        }

        // Readiness is enforced here, not trusted from the model: all five
        // checklist fields must actually be present.
        if decision.updates.flags.ready_to_book {
            if context.extracted.is_booking_ready() {
                context.set_ready_to_book(true);
            } else {
                tracing::debug!(
                    call_id,
                    missing = ?context.extracted.missing_booking_fields(),
                    "model claimed readiness but checklist is incomplete"
                );
            }
        }

        // Materialize the booking once the decision initiates it and the
        // checklist is genuinely complete.
        let mut booked = false;
        if matches!(
            decision.action,
            AgentAction::InitiateBooking | AgentAction::UpdateBooking
        ) && context.ready_to_book
        {
            let today = Utc::now().date_naive();
            match self
                .materializer
                .materialize(&context, &runtime.config, today)
                .await
            {
                Ok(appointment) => {
                    booked = context.appointment_id.is_none();
                    context.set_appointment_id(appointment.id);
                    context.add_tier_resolution(
                        TierResolution::new(TraceTier::Booking, "materialized", 1.0)
                            .with_source(appointment.id.to_string()),
                    );
                }
                Err(e) => {
                    tracing::error!(call_id, error = %e, "appointment creation failed, escalating");
                    context.add_tier_resolution(
                        TierResolution::new(TraceTier::Booking, "failed", 0.0)
                            .with_reasoning(e.to_string()),
                    );
                    decision.action = AgentAction::EscalateToHuman;
                    decision.next_prompt = BOOKING_ESCALATION_PROMPT.to_string();
                }
            }
        }

        context.append_transcript(Speaker::Agent, decision.next_prompt.clone());
        self.save_soft(&mut context).await;

        self.merge_usage(call_id, &turn_usage);
        self.trace.record_turn(TurnTrace {
            call_id: call_id.to_string(),
            company_id: company_id.to_string(),
            action: decision.action.as_str().to_string(),
            intent: classification.intent.as_str().to_string(),
            fell_back: outcome.fell_back,
            knowledge_tier,
            guardrails_triggered: turn_usage.guardrail_triggers,
            booked,
            tokens: turn_usage.total_tokens,
            latency_ms: started.elapsed().as_millis() as u64,
        });

        Ok(TurnReply {
            next_prompt: decision.next_prompt.clone(),
            decision,
        })
    }

    /// Reshape an authoritative fact for voice, falling back to the
    /// verbatim fact on any failure.
    async fn phrase_fact(
        &self,
        context: &mut CallContext,
        fact: &str,
        query: &str,
        turn_usage: &mut UsageData,
    ) -> String {
        let Some(ref model) = self.model else {
            return fact.to_string();
        };

        let reshaped = FactReshaper::new(model.as_ref()).reshape(fact, query).await;
        if reshaped.tokens > 0 {
            turn_usage.record_llm_call(reshaped.tokens);
        }
        context.add_tier_resolution(TierResolution::new(
            TraceTier::Reshape,
            if reshaped.reshaped { "reshaped" } else { "verbatim" },
            1.0,
        ));
        reshaped.text
    }

    fn company_runtime(&self, company_id: &str) -> Arc<CompanyRuntime> {
        match self.configs.company_runtime(company_id) {
            Some(runtime) => runtime,
            None => {
                tracing::warn!(company_id, "no runtime config on file, using fallback");
                Arc::new(CompanyRuntime::new(RuntimeConfig::fallback(company_id)))
            }
        }
    }

    /// Fail-soft context acquisition: a store failure degrades to a fresh
    /// context rather than aborting the call.
    async fn load_or_reinit(
        &self,
        call_id: &str,
        company_id: &str,
        runtime: &CompanyRuntime,
    ) -> CallContext {
        match self.store.load(call_id).await {
            Ok(Some(context)) => return context,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(call_id, error = %e, "context load failed, re-initializing");
            }
        }

        match self
            .store
            .init(
                call_id,
                company_id,
                &runtime.config.trade,
                &runtime.config.config_version,
            )
            .await
        {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(call_id, error = %e, "context init failed, proceeding in-memory");
                CallContext::new(
                    call_id,
                    company_id,
                    runtime.config.trade.as_str(),
                    runtime.config.config_version.as_str(),
                )
            }
        }
    }

    async fn save_soft(&self, context: &mut CallContext) {
        if let Err(e) = self.store.save(context).await {
            tracing::warn!(call_id = %context.call_id, error = %e, "context save failed, continuing");
        }
    }

    fn merge_usage(&self, call_id: &str, turn_usage: &UsageData) {
        self.usage
            .entry(call_id.to_string())
            .or_default()
            .merge(turn_usage);
    }

    async fn resolve_knowledge(
        &self,
        runtime: &CompanyRuntime,
        query: &str,
    ) -> Result<ResolutionOutcome, EngineError> {
        let key = format!(
            "{}:{}",
            runtime.config.company_id, runtime.config.config_version
        );
        let resolver = match self.resolvers.get(&key) {
            Some(resolver) => resolver.clone(),
            None => {
                let resolver = Arc::new(TieredResolver::for_company(
                    &runtime.config,
                    self.model.clone(),
                ));
                self.resolvers.insert(key, resolver.clone());
                resolver
            }
        };

        match tokio::time::timeout(self.knowledge_timeout, resolver.resolve(query)).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => Err(EngineError::KnowledgeLookupFailed(e.to_string())),
            Err(_) => Err(EngineError::KnowledgeLookupFailed(
                "knowledge lookup timed out".to_string(),
            )),
        }
    }
}
