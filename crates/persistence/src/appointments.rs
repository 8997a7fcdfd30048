//! Appointment records
//!
//! One appointment per call, ever: `(company_id, call_id)` is the
//! idempotency key and the primary unique-key lookup.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use frontdesk_core::RulePriority;

use crate::PersistenceError;

/// Appointment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

/// A scheduled service visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub company_id: String,
    pub contact_id: Uuid,
    pub location_id: Uuid,
    /// The call that created this appointment; unique per company
    pub call_id: String,
    pub trade: String,
    pub service_type: String,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<String>,
    pub priority: RulePriority,
    /// Heuristic urgency in [0, 100]
    pub urgency_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_rule_applied: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Appointment storage with the per-call unique lookup
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_by_call(
        &self,
        company_id: &str,
        call_id: &str,
    ) -> Result<Option<Appointment>, PersistenceError>;

    /// Insert a new appointment; `Conflict` if the call already has one.
    async fn create(&self, appointment: &Appointment) -> Result<(), PersistenceError>;
}

/// DashMap-backed appointment store keyed by `(company_id, call_id)`.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    by_call: DashMap<(String, String), Appointment>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_call.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_call.is_empty()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_by_call(
        &self,
        company_id: &str,
        call_id: &str,
    ) -> Result<Option<Appointment>, PersistenceError> {
        Ok(self
            .by_call
            .get(&(company_id.to_string(), call_id.to_string()))
            .map(|a| a.clone()))
    }

    async fn create(&self, appointment: &Appointment) -> Result<(), PersistenceError> {
        use dashmap::mapref::entry::Entry;

        let key = (appointment.company_id.clone(), appointment.call_id.clone());
        match self.by_call.entry(key) {
            Entry::Occupied(_) => Err(PersistenceError::Conflict(format!(
                "appointment for call {} already exists",
                appointment.call_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(appointment.clone());
                tracing::info!(
                    appointment_id = %appointment.id,
                    company_id = %appointment.company_id,
                    call_id = %appointment.call_id,
                    priority = appointment.priority.as_str(),
                    urgency_score = appointment.urgency_score,
                    "appointment created"
                );
                Ok(())
            }
        }
    }
}
