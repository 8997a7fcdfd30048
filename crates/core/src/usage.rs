//! Per-call usage accounting

use serde::{Deserialize, Serialize};

/// Aggregated usage for one call, recorded at finalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageData {
    /// Total chat-completion calls (decision + reshape + synthesis)
    pub llm_calls: u32,
    /// Tokens generated across all calls
    pub total_tokens: usize,
    /// Knowledge tier hit counts
    pub tier1_hits: u32,
    pub tier2_hits: u32,
    pub tier3_hits: u32,
    /// Deterministic fallback decisions taken
    pub fallback_decisions: u32,
    /// Guardrail rewrites applied
    pub guardrail_triggers: u32,
    /// Estimated spend in USD, summed from per-tier cost weights
    pub estimated_cost: f64,
}

impl UsageData {
    pub fn record_llm_call(&mut self, tokens: usize) {
        self.llm_calls += 1;
        self.total_tokens += tokens;
    }

    pub fn record_tier_hit(&mut self, tier: u8, cost: f64) {
        match tier {
            1 => self.tier1_hits += 1,
            2 => self.tier2_hits += 1,
            _ => self.tier3_hits += 1,
        }
        self.estimated_cost += cost;
    }

    /// Fold another usage record into this one (e.g. transport-side counts
    /// provided at call finalization).
    pub fn merge(&mut self, other: &UsageData) {
        self.llm_calls += other.llm_calls;
        self.total_tokens += other.total_tokens;
        self.tier1_hits += other.tier1_hits;
        self.tier2_hits += other.tier2_hits;
        self.tier3_hits += other.tier3_hits;
        self.fallback_decisions += other.fallback_decisions;
        self.guardrail_triggers += other.guardrail_triggers;
        self.estimated_cost += other.estimated_cost;
    }
}
