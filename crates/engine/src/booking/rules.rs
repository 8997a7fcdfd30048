//! Booking rule selection
//!
//! Rules are advisory: the first applicable rule annotates the
//! appointment, and when none passes the booking proceeds without rule
//! metadata. Selection never blocks scheduling.

use chrono::{Datelike, NaiveDate, Weekday};

use frontdesk_core::{BookingRule, RulePriority};

/// Context the selector evaluates rules against
#[derive(Debug, Clone)]
pub struct RuleContext<'a> {
    pub trade: &'a str,
    pub service_type: &'a str,
    pub priority: RulePriority,
    pub requested_date: Option<NaiveDate>,
    /// Injected so same-day checks are testable
    pub today: NaiveDate,
    pub is_emergency: bool,
}

fn weekday_abbrev(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

fn day_allowed(rule: &BookingRule, date: NaiveDate) -> bool {
    if rule.days_of_week.is_empty() {
        return true;
    }
    let abbrev = weekday_abbrev(date.weekday());
    rule.days_of_week
        .iter()
        .any(|d| d.to_lowercase().starts_with(abbrev))
}

fn hard_constraints_pass(rule: &BookingRule, ctx: &RuleContext) -> bool {
    let Some(date) = ctx.requested_date else {
        // Nothing dated yet, nothing to violate
        return true;
    };

    if !day_allowed(rule, date) {
        return false;
    }

    let is_weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
    if is_weekend && !rule.weekend_allowed {
        return false;
    }

    if date == ctx.today && !rule.same_day_allowed {
        return false;
    }

    true
}

/// Pick the most applicable rule: wildcard-filter on trade/service, stable
/// sort by priority rank, first rule whose hard constraints all pass.
pub fn select_rule<'a>(rules: &'a [BookingRule], ctx: &RuleContext<'_>) -> Option<&'a BookingRule> {
    let mut candidates: Vec<&BookingRule> = rules
        .iter()
        .filter(|r| r.matches(ctx.trade, ctx.service_type))
        .collect();

    candidates.sort_by_key(|r| r.priority.rank());

    let selected = candidates
        .into_iter()
        .find(|rule| hard_constraints_pass(rule, ctx));

    tracing::debug!(
        trade = ctx.trade,
        service_type = ctx.service_type,
        request_priority = ctx.priority.as_str(),
        is_emergency = ctx.is_emergency,
        selected = selected.map(|r| r.id.as_str()).unwrap_or("none"),
        "booking rule selection"
    );

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, priority: RulePriority) -> BookingRule {
        BookingRule {
            id: id.to_string(),
            trade: String::new(),
            service_type: String::new(),
            priority,
            days_of_week: vec![],
            weekend_allowed: true,
            same_day_allowed: true,
            time_window: None,
            label: None,
            notes: None,
        }
    }

    fn ctx(requested: Option<NaiveDate>) -> RuleContext<'static> {
        RuleContext {
            trade: "HVAC",
            service_type: "repair",
            priority: RulePriority::Normal,
            requested_date: requested,
            today: NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(), // a Wednesday
            is_emergency: false,
        }
    }

    #[test]
    fn test_emergency_beats_high_priority() {
        let rules = vec![rule("high", RulePriority::High), rule("emer", RulePriority::Emergency)];
        let selected = select_rule(&rules, &ctx(None)).unwrap();
        assert_eq!(selected.id, "emer");
    }

    #[test]
    fn test_stable_order_within_same_priority() {
        let rules = vec![rule("first", RulePriority::Normal), rule("second", RulePriority::Normal)];
        let selected = select_rule(&rules, &ctx(None)).unwrap();
        assert_eq!(selected.id, "first");
    }

    #[test]
    fn test_trade_filter() {
        let mut hvac = rule("hvac-only", RulePriority::Normal);
        hvac.trade = "HVAC".to_string();
        let mut plumbing = rule("plumbing-only", RulePriority::Emergency);
        plumbing.trade = "plumbing".to_string();

        let rules = [plumbing, hvac];
        let selected = select_rule(&rules, &ctx(None)).unwrap();
        assert_eq!(selected.id, "hvac-only");
    }

    #[test]
    fn test_weekend_rejection_returns_none() {
        let mut r = rule("weekday", RulePriority::Normal);
        r.trade = "HVAC".to_string();
        r.days_of_week = vec!["Mon".to_string(), "Tue".to_string()];
        r.weekend_allowed = false;

        // 2026-08-08 is a Saturday
        let saturday = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        let rules = [r];
        let selected = select_rule(&rules, &ctx(Some(saturday)));
        assert!(selected.is_none());
    }

    #[test]
    fn test_day_of_week_constraint() {
        let mut r = rule("mon-tue", RulePriority::Normal);
        r.days_of_week = vec!["Mon".to_string(), "Tue".to_string()];

        // 2026-08-10 is a Monday, 2026-08-12 is a Wednesday
        let monday = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();
        let wednesday = NaiveDate::from_ymd_opt(2026, 8, 12).unwrap();

        assert!(select_rule(std::slice::from_ref(&r), &ctx(Some(monday))).is_some());
        assert!(select_rule(std::slice::from_ref(&r), &ctx(Some(wednesday))).is_none());
    }

    #[test]
    fn test_full_day_names_accepted() {
        let mut r = rule("named", RulePriority::Normal);
        r.days_of_week = vec!["Monday".to_string()];

        let monday = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();
        assert!(select_rule(std::slice::from_ref(&r), &ctx(Some(monday))).is_some());
    }

    #[test]
    fn test_same_day_rejection_falls_through() {
        let mut strict = rule("no-same-day", RulePriority::High);
        strict.same_day_allowed = false;
        let lenient = rule("same-day-ok", RulePriority::Normal);

        let today = ctx(None).today;
        let rules = [strict, lenient];
        let selected = select_rule(&rules, &ctx(Some(today))).unwrap();
        assert_eq!(selected.id, "same-day-ok");
    }

    #[test]
    fn test_no_date_passes_constraints() {
        let mut r = rule("strict", RulePriority::Normal);
        r.days_of_week = vec!["Mon".to_string()];
        r.weekend_allowed = false;
        r.same_day_allowed = false;

        assert!(select_rule(std::slice::from_ref(&r), &ctx(None)).is_some());
    }

    #[test]
    fn test_empty_rule_list() {
        assert!(select_rule(&[], &ctx(None)).is_none());
    }
}
