//! End-to-end turn flow tests
//!
//! Drive the engine through `process_caller_turn` with a scripted chat
//! model and in-memory stores, covering the failure-path contracts: the
//! engine must always return a valid reply, never present a guess as fact,
//! and never create two appointments for one call.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use frontdesk_config::{
    CompanyRuntime, ConfigProvider, QaPair, RuntimeConfig, Scenario, Settings,
};
use frontdesk_core::{
    AgentAction, ChatCompletion, ChatError, ChatModel, ChatRequest, Speaker,
};
use frontdesk_engine::{TracingSink, TurnEngine};
use frontdesk_persistence::PersistenceLayer;
use frontdesk_store::{ContextStore, InMemoryContextStore, StoreError};

/// Scripted replies, consumed in call order (decision, then synthesis or
/// reshape calls as the turn requires them).
enum Reply {
    Text(String),
    Fail,
}

struct MockModel {
    replies: Mutex<VecDeque<Reply>>,
}

impl MockModel {
    fn scripted(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }
}

#[async_trait]
impl ChatModel for MockModel {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatCompletion, ChatError> {
        match self.replies.lock().pop_front() {
            Some(Reply::Text(text)) => Ok(ChatCompletion {
                text,
                tokens: 25,
                latency_ms: 2,
            }),
            Some(Reply::Fail) | None => Err(ChatError::Unavailable("scripted outage".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

struct SingleCompanyProvider {
    runtime: Arc<CompanyRuntime>,
}

impl SingleCompanyProvider {
    fn new(config: RuntimeConfig) -> Arc<Self> {
        Arc::new(Self {
            runtime: Arc::new(CompanyRuntime::new(config)),
        })
    }
}

impl ConfigProvider for SingleCompanyProvider {
    fn company_runtime(&self, company_id: &str) -> Option<Arc<CompanyRuntime>> {
        (company_id == self.runtime.config.company_id).then(|| self.runtime.clone())
    }
}

struct Harness {
    engine: TurnEngine,
    store: Arc<InMemoryContextStore>,
    persistence: PersistenceLayer,
}

fn harness(config: RuntimeConfig, model: Option<Arc<dyn ChatModel>>) -> Harness {
    let store = Arc::new(InMemoryContextStore::with_default_ttl());
    let persistence = PersistenceLayer::in_memory();
    let engine = TurnEngine::new(
        &Settings::default(),
        store.clone(),
        SingleCompanyProvider::new(config),
        model,
        persistence.clone(),
        Arc::new(TracingSink),
    );
    Harness {
        engine,
        store,
        persistence,
    }
}

fn company() -> RuntimeConfig {
    RuntimeConfig::fallback("co-1")
}

/// Decision JSON that fills the whole booking checklist and initiates.
fn booking_decision_json() -> String {
    r#"{
        "action": "initiate_booking",
        "next_prompt": "You're all set for Monday morning!",
        "updates": {
            "extracted": {
                "contact": {"name": "Dana Reyes", "phone": "602-555-0143"},
                "location": {"address_line1": "12 Elm St", "postal_code": "85004"},
                "problem": {"summary": "AC blowing warm air", "category": "repair"},
                "scheduling": {"preferred_date": "2026-08-10", "preferred_window": "morning"}
            },
            "flags": {"ready_to_book": true}
        }
    }"#
    .to_string()
}

#[tokio::test]
async fn scenario_a_wrong_number_with_llm_unavailable() {
    let h = harness(company(), None);

    let reply = h
        .engine
        .process_caller_turn("co-1", "call-a", Speaker::Caller, "oh sorry, wrong number")
        .await;

    assert_eq!(reply.decision.action, AgentAction::CloseCall);
    assert_eq!(reply.next_prompt, "Thank you for your call. Have a great day!");
}

#[tokio::test]
async fn emergency_fallback_on_malformed_model_output() {
    let model = MockModel::scripted(vec![Reply::Text("sure, I'd ask a question!".to_string())]);
    let h = harness(company(), Some(model));

    let reply = h
        .engine
        .process_caller_turn("co-1", "call-b", Speaker::Caller, "there's a gas leak here")
        .await;

    assert_eq!(reply.decision.action, AgentAction::AskQuestion);
    assert!(reply.next_prompt.contains("address"));
}

#[tokio::test]
async fn scenario_c_cross_turn_merge_keeps_both_fields() {
    let model = MockModel::scripted(vec![
        Reply::Text(
            r#"{"action": "ask_question", "next_prompt": "And the city?",
                "updates": {"extracted": {"contact": {"name": "John"}}}}"#
                .to_string(),
        ),
        Reply::Text(
            r#"{"action": "ask_question", "next_prompt": "Got it.",
                "updates": {"extracted": {"location": {"city": "Phoenix"}}}}"#
                .to_string(),
        ),
    ]);
    let h = harness(company(), Some(model));

    h.engine
        .process_caller_turn("co-1", "call-c", Speaker::Caller, "it's John")
        .await;
    h.engine
        .process_caller_turn("co-1", "call-c", Speaker::Caller, "Phoenix")
        .await;

    let context = h.store.load("call-c").await.unwrap().unwrap();
    assert_eq!(context.extracted.contact.name.as_deref(), Some("John"));
    assert_eq!(context.extracted.location.city.as_deref(), Some("Phoenix"));
}

#[tokio::test]
async fn guardrail_rewrites_unpriced_answer_to_escalation() {
    let model = MockModel::scripted(vec![Reply::Text(
        r#"{"action": "answer_with_knowledge", "next_prompt": "That repair is usually $95."}"#
            .to_string(),
    )]);
    // Zero price-like variables configured
    let h = harness(company(), Some(model));

    let reply = h
        .engine
        .process_caller_turn("co-1", "call-d", Speaker::Caller, "how much is a repair")
        .await;

    assert_eq!(reply.decision.action, AgentAction::EscalateToHuman);
    assert!(!reply.next_prompt.contains('$'));
}

#[tokio::test]
async fn scenario_d_low_confidence_synthesis_becomes_clarify() {
    let model = MockModel::scripted(vec![
        // Decision asks for knowledge
        Reply::Text(
            r#"{"action": "answer_with_knowledge", "next_prompt": "One sec.",
                "needs_knowledge_search": true,
                "knowledge_query": "do you repair geothermal wells"}"#
                .to_string(),
        ),
        // Tier 3 synthesis comes back unsure
        Reply::Text(r#"{"answer": "Probably, I would guess so.", "confidence": 0.3}"#.to_string()),
    ]);
    let h = harness(company(), Some(model));

    let reply = h
        .engine
        .process_caller_turn(
            "co-1",
            "call-e",
            Speaker::Caller,
            "do you repair geothermal wells",
        )
        .await;

    assert_eq!(reply.decision.action, AgentAction::ClarifyIntent);
    assert!(!reply.next_prompt.contains("guess"));
}

#[tokio::test]
async fn tier1_answer_with_failed_reshape_is_verbatim_fact() {
    let mut config = company();
    config.scenarios = vec![Scenario {
        id: "warm-air".to_string(),
        keywords: vec!["warm air".to_string()],
        answer: "A system blowing warm air usually needs a refrigerant check.".to_string(),
        category: None,
    }];

    let model = MockModel::scripted(vec![
        Reply::Text(
            r#"{"action": "answer_with_knowledge", "next_prompt": "Let me check.",
                "needs_knowledge_search": true, "knowledge_query": "vents blow warm air"}"#
                .to_string(),
        ),
        // The reshape call dies; the verified fact must go out verbatim.
        Reply::Fail,
    ]);
    let h = harness(config, Some(model));

    let reply = h
        .engine
        .process_caller_turn("co-1", "call-f", Speaker::Caller, "my vents blow warm air")
        .await;

    assert_eq!(reply.decision.action, AgentAction::AnswerWithKnowledge);
    assert_eq!(
        reply.next_prompt,
        "A system blowing warm air usually needs a refrigerant check."
    );
}

#[tokio::test]
async fn tier2_answer_is_reshaped_when_model_healthy() {
    let mut config = company();
    config.qa_pairs = vec![QaPair {
        id: "qa-warranty".to_string(),
        question: "Do repairs come with a warranty?".to_string(),
        answer: "All repairs carry a one-year warranty.".to_string(),
    }];

    let model = MockModel::scripted(vec![
        Reply::Text(
            r#"{"action": "answer_with_knowledge", "next_prompt": "Checking.",
                "needs_knowledge_search": true,
                "knowledge_query": "do repairs come with a warranty"}"#
                .to_string(),
        ),
        Reply::Text("Good news - every repair includes a one-year warranty.".to_string()),
    ]);
    let h = harness(config, Some(model));

    let reply = h
        .engine
        .process_caller_turn(
            "co-1",
            "call-g",
            Speaker::Caller,
            "do repairs come with a warranty",
        )
        .await;

    assert_eq!(reply.decision.action, AgentAction::AnswerWithKnowledge);
    assert_eq!(
        reply.next_prompt,
        "Good news - every repair includes a one-year warranty."
    );
}

#[tokio::test]
async fn booking_turn_creates_exactly_one_appointment() {
    let model = MockModel::scripted(vec![
        Reply::Text(booking_decision_json()),
        Reply::Text(booking_decision_json()),
    ]);
    let h = harness(company(), Some(model));

    h.engine
        .process_caller_turn("co-1", "call-h", Speaker::Caller, "yes please book it")
        .await;
    let first = h
        .persistence
        .appointments
        .find_by_call("co-1", "call-h")
        .await
        .unwrap()
        .expect("appointment created");

    // A duplicate booking turn for the same call must return the existing
    // record untouched.
    h.engine
        .process_caller_turn("co-1", "call-h", Speaker::Caller, "book it again?")
        .await;
    let second = h
        .persistence
        .appointments
        .find_by_call("co-1", "call-h")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first, second);

    let context = h.store.load("call-h").await.unwrap().unwrap();
    assert_eq!(context.appointment_id, Some(first.id));
}

#[tokio::test]
async fn model_readiness_claim_without_checklist_is_ignored() {
    let model = MockModel::scripted(vec![Reply::Text(
        // Claims readiness with almost nothing captured
        r#"{"action": "initiate_booking", "next_prompt": "Booked!",
            "updates": {"extracted": {"contact": {"name": "Sam"}},
            "flags": {"ready_to_book": true}}}"#
            .to_string(),
    )]);
    let h = harness(company(), Some(model));

    h.engine
        .process_caller_turn("co-1", "call-i", Speaker::Caller, "book me")
        .await;

    assert!(h
        .persistence
        .appointments
        .find_by_call("co-1", "call-i")
        .await
        .unwrap()
        .is_none());

    let context = h.store.load("call-i").await.unwrap().unwrap();
    assert!(!context.ready_to_book);
}

#[tokio::test]
async fn agent_speaker_lines_are_transcript_only() {
    let h = harness(company(), None);

    let reply = h
        .engine
        .process_caller_turn("co-1", "call-j", Speaker::Agent, "Thanks for calling!")
        .await;

    assert_eq!(reply.decision.action, AgentAction::NoOp);
    let context = h.store.load("call-j").await.unwrap().unwrap();
    assert_eq!(context.transcript.len(), 1);
    assert_eq!(context.transcript[0].speaker, Speaker::Agent);
}

#[tokio::test]
async fn unknown_company_still_gets_a_reply() {
    let h = harness(company(), None);

    let reply = h
        .engine
        .process_caller_turn("co-unknown", "call-k", Speaker::Caller, "hello?")
        .await;

    assert!(!reply.next_prompt.is_empty());
}

// A store whose every operation fails, to prove the engine is fail-soft.
struct BrokenStore;

#[async_trait]
impl ContextStore for BrokenStore {
    async fn init(
        &self,
        _call_id: &str,
        _company_id: &str,
        _trade: &str,
        _config_version: &str,
    ) -> Result<frontdesk_core::CallContext, StoreError> {
        Err(StoreError::Io("disk on fire".to_string()))
    }

    async fn load(
        &self,
        _call_id: &str,
    ) -> Result<Option<frontdesk_core::CallContext>, StoreError> {
        Err(StoreError::Io("disk on fire".to_string()))
    }

    async fn save(&self, _context: &mut frontdesk_core::CallContext) -> Result<(), StoreError> {
        Err(StoreError::Io("disk on fire".to_string()))
    }

    async fn delete(&self, _call_id: &str) -> Result<(), StoreError> {
        Err(StoreError::Io("disk on fire".to_string()))
    }
}

#[tokio::test]
async fn turn_survives_total_store_failure() {
    let engine = TurnEngine::new(
        &Settings::default(),
        Arc::new(BrokenStore),
        SingleCompanyProvider::new(company()),
        None,
        PersistenceLayer::in_memory(),
        Arc::new(TracingSink),
    );

    let reply = engine
        .process_caller_turn("co-1", "call-l", Speaker::Caller, "can someone come out")
        .await;

    // The conversation continues despite the store being down.
    assert!(!reply.next_prompt.is_empty());
}

#[tokio::test]
async fn finalize_archives_then_deletes_context() {
    let model = MockModel::scripted(vec![Reply::Text(booking_decision_json())]);
    let h = harness(company(), Some(model));

    let started = chrono::Utc::now();
    h.engine
        .process_caller_turn("co-1", "call-m", Speaker::Caller, "book my repair")
        .await;

    h.engine
        .finalize_call("call-m", started, chrono::Utc::now(), Default::default())
        .await
        .unwrap();

    let record = h
        .persistence
        .call_records
        .get("call-m")
        .await
        .unwrap()
        .expect("call archived");
    assert!(record.appointment_id.is_some());
    assert!(!record.transcript.is_empty());
    assert!(record.usage.llm_calls >= 1);

    // Deleted only after durable archive
    assert!(h.store.load("call-m").await.unwrap().is_none());
}
