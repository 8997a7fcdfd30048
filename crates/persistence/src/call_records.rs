//! Archived call records
//!
//! A call's context is deleted from the live store only after it has been
//! durably archived here by `finalize_call`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use frontdesk_core::{TierResolution, TranscriptEntry, UsageData};

use crate::PersistenceError;

/// Archived summary of a finished call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_id: String,
    pub company_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub transcript: Vec<TranscriptEntry>,
    pub tier_trace: Vec<TierResolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
    pub usage: UsageData,
    pub archived_at: DateTime<Utc>,
}

/// Durable archive of finished calls
#[async_trait]
pub trait CallRecordStore: Send + Sync {
    async fn archive(&self, record: &CallRecord) -> Result<(), PersistenceError>;

    async fn get(&self, call_id: &str) -> Result<Option<CallRecord>, PersistenceError>;
}

/// DashMap-backed call archive.
#[derive(Default)]
pub struct InMemoryCallRecordStore {
    records: DashMap<String, CallRecord>,
}

impl InMemoryCallRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CallRecordStore for InMemoryCallRecordStore {
    async fn archive(&self, record: &CallRecord) -> Result<(), PersistenceError> {
        self.records
            .insert(record.call_id.clone(), record.clone());
        tracing::info!(
            call_id = %record.call_id,
            company_id = %record.company_id,
            llm_calls = record.usage.llm_calls,
            "call archived"
        );
        Ok(())
    }

    async fn get(&self, call_id: &str) -> Result<Option<CallRecord>, PersistenceError> {
        Ok(self.records.get(call_id).map(|r| r.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_archive_and_get() {
        let store = InMemoryCallRecordStore::new();
        let now = Utc::now();
        let record = CallRecord {
            call_id: "call-1".to_string(),
            company_id: "co-1".to_string(),
            started_at: now,
            ended_at: now,
            transcript: Vec::new(),
            tier_trace: Vec::new(),
            appointment_id: None,
            usage: UsageData::default(),
            archived_at: now,
        };

        store.archive(&record).await.unwrap();
        let found = store.get("call-1").await.unwrap().unwrap();
        assert_eq!(found, record);
    }
}
