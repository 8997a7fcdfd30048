//! Service location records
//!
//! Locations are resolved by `(address_line1, postal_code)` within a
//! company. Incomplete address data produces a placeholder location rather
//! than blocking booking; dispatch fills it in later.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::PersistenceError;

/// A service address known to a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub company_id: String,
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    /// True when created from incomplete caller data
    pub placeholder: bool,
    pub created_at: DateTime<Utc>,
}

impl Location {
    pub fn new(
        company_id: impl Into<String>,
        address_line1: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id: company_id.into(),
            address_line1: address_line1.into(),
            address_line2: None,
            city: None,
            state: None,
            postal_code: postal_code.into(),
            placeholder: false,
            created_at: Utc::now(),
        }
    }

    /// Placeholder for bookings whose address is still unknown or partial.
    pub fn placeholder(company_id: impl Into<String>, call_id: &str) -> Self {
        let mut location = Self::new(
            company_id,
            format!("pending address ({})", call_id),
            "00000",
        );
        location.placeholder = true;
        location
    }
}

fn address_key(company_id: &str, address_line1: &str, postal_code: &str) -> (String, String) {
    (
        company_id.to_string(),
        format!(
            "{}|{}",
            address_line1.trim().to_lowercase(),
            postal_code.trim()
        ),
    )
}

/// Location storage with address-scoped lookup
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn find_by_address(
        &self,
        company_id: &str,
        address_line1: &str,
        postal_code: &str,
    ) -> Result<Option<Location>, PersistenceError>;

    async fn insert(&self, location: &Location) -> Result<(), PersistenceError>;
}

/// DashMap-backed location store keyed by `(company_id, address|postal)`.
#[derive(Default)]
pub struct InMemoryLocationStore {
    by_address: DashMap<(String, String), Location>,
}

impl InMemoryLocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn find_by_address(
        &self,
        company_id: &str,
        address_line1: &str,
        postal_code: &str,
    ) -> Result<Option<Location>, PersistenceError> {
        Ok(self
            .by_address
            .get(&address_key(company_id, address_line1, postal_code))
            .map(|l| l.clone()))
    }

    async fn insert(&self, location: &Location) -> Result<(), PersistenceError> {
        let key = address_key(
            &location.company_id,
            &location.address_line1,
            &location.postal_code,
        );
        self.by_address.insert(key, location.clone());

        tracing::info!(
            location_id = %location.id,
            company_id = %location.company_id,
            placeholder = location.placeholder,
            "location created"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_find_case_insensitive() {
        let store = InMemoryLocationStore::new();
        let location = Location::new("co-1", "12 Elm St", "85004");
        store.insert(&location).await.unwrap();

        let found = store
            .find_by_address("co-1", "12 ELM ST", "85004")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, location.id);
    }

    #[tokio::test]
    async fn test_placeholder_location() {
        let location = Location::placeholder("co-1", "call-9");
        assert!(location.placeholder);
        assert!(location.address_line1.contains("call-9"));
    }

    #[tokio::test]
    async fn test_different_postal_is_different_location() {
        let store = InMemoryLocationStore::new();
        store
            .insert(&Location::new("co-1", "12 Elm St", "85004"))
            .await
            .unwrap();

        assert!(store
            .find_by_address("co-1", "12 Elm St", "85005")
            .await
            .unwrap()
            .is_none());
    }
}
