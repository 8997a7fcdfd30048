//! Booking rules
//!
//! Advisory scheduling constraints supplied by per-company configuration.
//! The engine selects the most applicable rule; rules never hard-block a
//! booking.

use serde::{Deserialize, Serialize};

/// Rule priority; lower rank wins the stable sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RulePriority {
    Emergency,
    High,
    #[default]
    Normal,
}

impl RulePriority {
    pub fn rank(&self) -> u8 {
        match self {
            Self::Emergency => 0,
            Self::High => 1,
            Self::Normal => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::High => "high",
            Self::Normal => "normal",
        }
    }
}

/// One configured scheduling rule. Blank `trade`/`service_type` matches any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRule {
    pub id: String,
    #[serde(default)]
    pub trade: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub priority: RulePriority,
    /// Allowed weekdays ("Mon".."Sun"); empty list = any day
    #[serde(default)]
    pub days_of_week: Vec<String>,
    #[serde(default = "default_true")]
    pub weekend_allowed: bool,
    #[serde(default = "default_true")]
    pub same_day_allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_true() -> bool {
    true
}

impl BookingRule {
    /// Whether this rule applies to the given trade/service pair
    /// (blank rule fields are wildcards).
    pub fn matches(&self, trade: &str, service_type: &str) -> bool {
        (self.trade.is_empty() || self.trade.eq_ignore_ascii_case(trade))
            && (self.service_type.is_empty()
                || self.service_type.eq_ignore_ascii_case(service_type))
    }
}
