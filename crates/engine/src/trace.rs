//! Fire-and-forget trace recording
//!
//! Every turn emits one `TurnTrace`. Recording runs on a detached task and
//! never blocks the reply path; a sink failure is logged and dropped.
//! Metrics counters go out synchronously through the `metrics` facade (the
//! facade is non-blocking; exporters are the hosting process's concern).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use frontdesk_core::UsageData;

/// One turn's observability record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnTrace {
    pub call_id: String,
    pub company_id: String,
    pub action: String,
    pub intent: String,
    pub fell_back: bool,
    pub knowledge_tier: Option<u8>,
    pub guardrails_triggered: u32,
    pub booked: bool,
    pub tokens: usize,
    pub latency_ms: u64,
}

/// Where traces go. Implementations must be cheap to call; the recorder
/// already detaches them from the reply path.
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn record_turn(&self, trace: TurnTrace) -> Result<(), String>;

    async fn record_usage(&self, call_id: &str, usage: &UsageData) -> Result<(), String>;
}

/// Default sink: structured tracing events.
pub struct TracingSink;

#[async_trait]
impl TraceSink for TracingSink {
    async fn record_turn(&self, trace: TurnTrace) -> Result<(), String> {
        tracing::info!(
            call_id = %trace.call_id,
            company_id = %trace.company_id,
            action = %trace.action,
            intent = %trace.intent,
            fell_back = trace.fell_back,
            knowledge_tier = ?trace.knowledge_tier,
            guardrails = trace.guardrails_triggered,
            booked = trace.booked,
            tokens = trace.tokens,
            latency_ms = trace.latency_ms,
            "turn processed"
        );
        Ok(())
    }

    async fn record_usage(&self, call_id: &str, usage: &UsageData) -> Result<(), String> {
        tracing::info!(
            call_id,
            llm_calls = usage.llm_calls,
            total_tokens = usage.total_tokens,
            tier1_hits = usage.tier1_hits,
            tier2_hits = usage.tier2_hits,
            tier3_hits = usage.tier3_hits,
            fallbacks = usage.fallback_decisions,
            estimated_cost = usage.estimated_cost,
            "call usage"
        );
        Ok(())
    }
}

/// Detached recorder wrapping a sink
#[derive(Clone)]
pub struct TraceRecorder {
    sink: Arc<dyn TraceSink>,
}

impl TraceRecorder {
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self { sink }
    }

    /// Record one turn. Returns immediately; failures are logged only.
    pub fn record_turn(&self, trace: TurnTrace) {
        metrics::counter!("frontdesk_turns_total").increment(1);
        if trace.fell_back {
            metrics::counter!("frontdesk_fallback_decisions_total").increment(1);
        }
        if trace.guardrails_triggered > 0 {
            metrics::counter!("frontdesk_guardrail_triggers_total")
                .increment(trace.guardrails_triggered as u64);
        }
        if let Some(tier) = trace.knowledge_tier {
            metrics::counter!("frontdesk_knowledge_tier_hits_total", "tier" => tier.to_string())
                .increment(1);
        }
        if trace.booked {
            metrics::counter!("frontdesk_bookings_total").increment(1);
        }
        metrics::histogram!("frontdesk_turn_latency_ms").record(trace.latency_ms as f64);

        let sink = self.sink.clone();
        tokio::spawn(async move {
            let call_id = trace.call_id.clone();
            if let Err(e) = sink.record_turn(trace).await {
                tracing::debug!(call_id, error = %e, "turn trace sink failed");
            }
        });
    }

    /// Record final call usage. Returns immediately; failures are logged
    /// only.
    pub fn record_usage(&self, call_id: &str, usage: UsageData) {
        let sink = self.sink.clone();
        let call_id = call_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = sink.record_usage(&call_id, &usage).await {
                tracing::debug!(call_id, error = %e, "usage trace sink failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct CountingSink {
        turns: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl TraceSink for CountingSink {
        async fn record_turn(&self, _trace: TurnTrace) -> Result<(), String> {
            if self.fail {
                return Err("sink down".to_string());
            }
            self.turns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn record_usage(&self, _call_id: &str, _usage: &UsageData) -> Result<(), String> {
            Ok(())
        }
    }

    fn trace() -> TurnTrace {
        TurnTrace {
            call_id: "call-1".to_string(),
            company_id: "co-1".to_string(),
            action: "ask_question".to_string(),
            intent: "booking".to_string(),
            fell_back: false,
            knowledge_tier: None,
            guardrails_triggered: 0,
            booked: false,
            tokens: 50,
            latency_ms: 120,
        }
    }

    #[tokio::test]
    async fn test_record_turn_reaches_sink() {
        let sink = Arc::new(CountingSink {
            turns: AtomicU32::new(0),
            fail: false,
        });
        let recorder = TraceRecorder::new(sink.clone());

        recorder.record_turn(trace());
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(sink.turns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sink_failure_never_propagates() {
        let sink = Arc::new(CountingSink {
            turns: AtomicU32::new(0),
            fail: true,
        });
        let recorder = TraceRecorder::new(sink);

        // Must not panic or block
        recorder.record_turn(trace());
        recorder.record_usage("call-1", UsageData::default());
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
