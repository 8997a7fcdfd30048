//! In-memory context store
//!
//! Reference implementation over `DashMap` with per-entry expiry. Suitable
//! for single-process deployments and tests; a distributed deployment
//! plugs a different `ContextStore` in behind the same trait.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use frontdesk_core::CallContext;

use crate::context_store::{decode_context, encode_context, touch, ContextStore};
use crate::StoreError;

struct StoredEntry {
    payload: String,
    expires_at: Instant,
}

/// DashMap-backed context store with TTL expiry.
pub struct InMemoryContextStore {
    entries: DashMap<String, StoredEntry>,
    ttl: Duration,
}

impl InMemoryContextStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Default four-hour TTL, matching the longest plausible call plus
    /// post-call archival lag.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(4 * 60 * 60))
    }

    fn put(&self, call_id: &str, payload: String) {
        self.entries.insert(
            call_id.to_string(),
            StoredEntry {
                payload,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn init(
        &self,
        call_id: &str,
        company_id: &str,
        trade: &str,
        config_version: &str,
    ) -> Result<CallContext, StoreError> {
        let context = CallContext::new(call_id, company_id, trade, config_version);
        let payload = encode_context(&context)?;
        self.put(call_id, payload);

        tracing::debug!(call_id, company_id, "call context initialized");
        Ok(context)
    }

    async fn load(&self, call_id: &str) -> Result<Option<CallContext>, StoreError> {
        // Snapshot under the shard lock, mutate after releasing it.
        let snapshot = self
            .entries
            .get(call_id)
            .map(|entry| (entry.payload.clone(), entry.expires_at <= Instant::now()));

        let payload = match snapshot {
            Some((_, true)) => {
                self.entries.remove(call_id);
                tracing::debug!(call_id, "call context expired");
                return Ok(None);
            }
            Some((payload, false)) => payload,
            None => return Ok(None),
        };

        match decode_context(&payload) {
            Ok(context) => Ok(Some(context)),
            Err(StoreError::SchemaVersion { found, expected }) => {
                // A stale deploy's context is unusable; treat as absent.
                tracing::warn!(call_id, found, expected, "dropping context with stale schema");
                self.entries.remove(call_id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self, context: &mut CallContext) -> Result<(), StoreError> {
        touch(context);
        let payload = encode_context(context)?;
        self.put(&context.call_id, payload);
        Ok(())
    }

    async fn delete(&self, call_id: &str) -> Result<(), StoreError> {
        self.entries.remove(call_id);
        tracing::debug!(call_id, "call context deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontdesk_core::{ContactInfo, ExtractedPatch, Speaker};

    fn store() -> InMemoryContextStore {
        InMemoryContextStore::with_default_ttl()
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let store = store();
        let mut ctx = store.init("call-1", "co-1", "hvac", "v1").await.unwrap();

        ctx.append_transcript(Speaker::Caller, "my furnace is dead");
        ctx.merge_extracted(&ExtractedPatch {
            contact: Some(ContactInfo {
                name: Some("Dana".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        store.save(&mut ctx).await.unwrap();

        let loaded = store.load("call-1").await.unwrap().unwrap();
        assert_eq!(loaded, ctx);
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let store = store();
        assert!(store.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_behaves_as_absent() {
        let store = InMemoryContextStore::new(Duration::from_millis(50));
        store.init("call-1", "co-1", "hvac", "v1").await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.load("call-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_refreshes_expiry() {
        let store = InMemoryContextStore::new(Duration::from_millis(300));
        let mut ctx = store.init("call-1", "co-1", "hvac", "v1").await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        store.save(&mut ctx).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // 400ms since init but only 200ms since the save
        assert!(store.load("call-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let store = store();
        store.init("call-1", "co-1", "hvac", "v1").await.unwrap();
        store.delete("call-1").await.unwrap();
        assert!(store.load("call-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_bumps_updated_at() {
        let store = store();
        let mut ctx = store.init("call-1", "co-1", "hvac", "v1").await.unwrap();
        let before = ctx.updated_at;

        tokio::time::sleep(Duration::from_millis(5)).await;
        store.save(&mut ctx).await.unwrap();

        assert!(ctx.updated_at > before);
    }
}
