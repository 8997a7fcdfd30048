//! Contact records
//!
//! Contacts are resolved by normalized phone number within a company scope:
//! created as `new_lead` on first sight, updated non-destructively on later
//! sightings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::PersistenceError;

/// Contact lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    NewLead,
    Customer,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewLead => "new_lead",
            Self::Customer => "customer",
        }
    }
}

/// A caller known to a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub company_id: String,
    /// Normalized E.164-ish phone, the lookup key within the company
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn new_lead(company_id: impl Into<String>, phone: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            company_id: company_id.into(),
            phone: phone.into(),
            name: None,
            email: None,
            status: ContactStatus::NewLead,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Normalize a raw phone string for matching.
///
/// Bare 10-digit North American numbers become `+1XXXXXXXXXX`; an 11-digit
/// number with a leading 1 gets a `+`. Anything with fewer than 7 digits is
/// not a usable callback number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        0..=6 => None,
        10 => Some(format!("+1{}", digits)),
        11 if digits.starts_with('1') => Some(format!("+{}", digits)),
        _ => Some(format!("+{}", digits)),
    }
}

/// Contact storage with phone-scoped lookup
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn find_by_phone(
        &self,
        company_id: &str,
        phone: &str,
    ) -> Result<Option<Contact>, PersistenceError>;

    async fn insert(&self, contact: &Contact) -> Result<(), PersistenceError>;

    async fn update(&self, contact: &Contact) -> Result<(), PersistenceError>;
}

/// DashMap-backed contact store keyed by `(company_id, phone)`.
#[derive(Default)]
pub struct InMemoryContactStore {
    by_phone: DashMap<(String, String), Contact>,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_phone.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_phone.is_empty()
    }
}

#[async_trait]
impl ContactStore for InMemoryContactStore {
    async fn find_by_phone(
        &self,
        company_id: &str,
        phone: &str,
    ) -> Result<Option<Contact>, PersistenceError> {
        Ok(self
            .by_phone
            .get(&(company_id.to_string(), phone.to_string()))
            .map(|c| c.clone()))
    }

    async fn insert(&self, contact: &Contact) -> Result<(), PersistenceError> {
        let key = (contact.company_id.clone(), contact.phone.clone());
        if self.by_phone.contains_key(&key) {
            return Err(PersistenceError::Conflict(format!(
                "contact with phone {} already exists",
                contact.phone
            )));
        }
        self.by_phone.insert(key, contact.clone());

        tracing::info!(
            contact_id = %contact.id,
            company_id = %contact.company_id,
            status = contact.status.as_str(),
            "contact created"
        );
        Ok(())
    }

    async fn update(&self, contact: &Contact) -> Result<(), PersistenceError> {
        let key = (contact.company_id.clone(), contact.phone.clone());
        self.by_phone.insert(key, contact.clone());
        Ok(())
    }
}
