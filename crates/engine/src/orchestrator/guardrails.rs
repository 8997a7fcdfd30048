//! Guardrail post-filter
//!
//! Deterministic scans applied to model output after the fact. Prompt
//! instructions are not enforcement: a model told to never quote prices
//! will still quote one eventually, so these checks run on every
//! non-terminal decision.
//!
//! Three hazard classes:
//! 1. price talk when the company has no price configuration
//! 2. unconditional arrival promises outside of booking
//! 3. capability claims the configuration does not back

use once_cell::sync::Lazy;
use regex::Regex;

use frontdesk_config::RuntimeConfig;
use frontdesk_core::{AgentAction, OrchestratorDecision, TierResolution, TraceTier};

pub const PRICE_ESCALATION_PROMPT: &str = "Pricing really depends on what our \
technician finds on site, so I don't want to guess. Let me have a team member \
follow up with exact numbers - what's the best callback number for you?";

static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[$€£]\s*\d|\b(price|prices|pricing|cost|costs|charge|charges|fee|fees|quote|estimate|dollars)\b")
        .expect("static regex")
});

/// (pattern, softened replacement) pairs for dispatch-time promises.
static ARRIVAL_SOFTENERS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)we(?:'ll| will) be (?:right )?there\b").expect("static regex"),
            "we can schedule a visit",
        ),
        (
            Regex::new(r"(?i)we(?:'re| are) on (?:our|the) way\b").expect("static regex"),
            "we can get a visit on the schedule",
        ),
        (
            Regex::new(r"(?i)we(?:'ll| will) arrive\b").expect("static regex"),
            "we can schedule arrival",
        ),
        (
            Regex::new(r"(?i)someone (?:is|will be) (?:there|out) (?:today|shortly|right away)\b")
                .expect("static regex"),
            "we can look at getting someone out",
        ),
    ]
});

static AROUND_THE_CLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(24/7|24-7|24 hours a day|around the clock)\b").expect("static regex")
});

static EMERGENCY_SERVICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bemergency (service|services|line|dispatch)\b").expect("static regex"));

static LEFTOVER_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").expect("static regex"));
static SPACE_BEFORE_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([.,!?])").expect("static regex"));

fn tidy(text: &str) -> String {
    let text = LEFTOVER_SPACE_RE.replace_all(text, " ");
    SPACE_BEFORE_PUNCT_RE
        .replace_all(&text, "$1")
        .trim()
        .to_string()
}

/// Apply the post-filter. Returns the (possibly rewritten) decision plus
/// one audit entry per guardrail that fired. Terminal actions pass through
/// untouched.
pub fn apply_guardrails(
    mut decision: OrchestratorDecision,
    config: &RuntimeConfig,
) -> (OrchestratorDecision, Vec<TierResolution>) {
    if decision.action.is_terminal() {
        return (decision, Vec::new());
    }

    let mut triggered = Vec::new();

    // 1. Price talk without price configuration: the model has nothing
    //    verified to quote from, so the answer cannot be trusted.
    if decision.action == AgentAction::AnswerWithKnowledge
        && !config.has_price_variable()
        && PRICE_RE.is_match(&decision.next_prompt)
    {
        tracing::warn!(
            company_id = %config.company_id,
            "price language in knowledge answer with no price config, escalating"
        );
        decision.action = AgentAction::EscalateToHuman;
        decision.next_prompt = PRICE_ESCALATION_PROMPT.to_string();
        triggered.push(
            TierResolution::new(TraceTier::Guardrail, "price_escalation", 1.0)
                .with_reasoning("price language with no price-like config variable"),
        );
        // Escalation is terminal; nothing further applies.
        return (decision, triggered);
    }

    // 2. Unconditional arrival promises are only allowed while actually
    //    booking.
    if decision.action != AgentAction::InitiateBooking {
        let mut softened = false;
        for (pattern, replacement) in ARRIVAL_SOFTENERS.iter() {
            if pattern.is_match(&decision.next_prompt) {
                decision.next_prompt = pattern
                    .replace_all(&decision.next_prompt, *replacement)
                    .into_owned();
                softened = true;
            }
        }
        if softened {
            decision.next_prompt = tidy(&decision.next_prompt);
            triggered.push(
                TierResolution::new(TraceTier::Guardrail, "softened_dispatch_language", 1.0)
                    .with_reasoning("arrival promise outside booking"),
            );
        }
    }

    // 3. Capability claims the configuration does not support.
    let mut stripped = false;
    if !config.capabilities.around_the_clock && AROUND_THE_CLOCK_RE.is_match(&decision.next_prompt)
    {
        decision.next_prompt = AROUND_THE_CLOCK_RE
            .replace_all(&decision.next_prompt, "")
            .into_owned();
        stripped = true;
    }
    if !config.capabilities.emergency_service
        && EMERGENCY_SERVICE_RE.is_match(&decision.next_prompt)
    {
        decision.next_prompt = EMERGENCY_SERVICE_RE
            .replace_all(&decision.next_prompt, "service")
            .into_owned();
        stripped = true;
    }
    if stripped {
        decision.next_prompt = tidy(&decision.next_prompt);
        triggered.push(
            TierResolution::new(TraceTier::Guardrail, "stripped_capability_claim", 1.0)
                .with_reasoning("claim not backed by company capabilities"),
        );
    }

    (decision, triggered)
}
