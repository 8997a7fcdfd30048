//! Tier 1: keyword/triage match against the scenario catalog
//!
//! Deterministic and allocation-light; scenarios carry curated trigger
//! phrases, so a single phrase hit is already a strong signal.

use frontdesk_config::Scenario;

/// Precompiled scenario catalog matcher
pub struct ScenarioMatcher {
    scenarios: Vec<CompiledScenario>,
}

struct CompiledScenario {
    id: String,
    keywords: Vec<String>,
    answer: String,
}

/// A scenario hit with its match strength
pub struct ScenarioHit<'a> {
    pub id: &'a str,
    pub answer: &'a str,
    pub confidence: f32,
}

impl ScenarioMatcher {
    pub fn new(scenarios: &[Scenario]) -> Self {
        Self {
            scenarios: scenarios
                .iter()
                .map(|s| CompiledScenario {
                    id: s.id.clone(),
                    keywords: s.keywords.iter().map(|k| k.to_lowercase()).collect(),
                    answer: s.answer.clone(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Best-matching scenario for a query, if any phrase hits.
    ///
    /// Confidence starts at 0.6 for one phrase hit and climbs with each
    /// additional hit, capped below 1.0 so tier-1 never claims certainty.
    pub fn best_match(&self, query: &str) -> Option<ScenarioHit<'_>> {
        let query = query.to_lowercase();

        self.scenarios
            .iter()
            .filter_map(|scenario| {
                let hits = scenario
                    .keywords
                    .iter()
                    .filter(|k| query.contains(k.as_str()))
                    .count();
                if hits == 0 {
                    return None;
                }
                let confidence = (0.6 + 0.15 * (hits as f32 - 1.0)).min(0.95);
                Some((hits, scenario, confidence))
            })
            .max_by(|a, b| {
                a.0.cmp(&b.0)
                    .then(a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            })
            .map(|(_, scenario, confidence)| ScenarioHit {
                id: &scenario.id,
                answer: &scenario.answer,
                confidence,
            })
    }
}
