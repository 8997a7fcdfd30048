//! Context store trait and the serialization envelope

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use frontdesk_core::{CallContext, CONTEXT_SCHEMA_VERSION};

use crate::StoreError;

/// Versioned wrapper around the serialized context.
#[derive(Debug, Serialize, Deserialize)]
struct ContextEnvelope {
    schema_version: u32,
    context: CallContext,
}

/// Serialize a context into its versioned envelope.
pub fn encode_context(context: &CallContext) -> Result<String, StoreError> {
    let envelope = ContextEnvelope {
        schema_version: CONTEXT_SCHEMA_VERSION,
        context: context.clone(),
    };
    serde_json::to_string(&envelope).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Deserialize an envelope, rejecting unknown schema versions.
pub fn decode_context(payload: &str) -> Result<CallContext, StoreError> {
    let envelope: ContextEnvelope =
        serde_json::from_str(payload).map_err(|e| StoreError::Serialization(e.to_string()))?;
    if envelope.schema_version != CONTEXT_SCHEMA_VERSION {
        return Err(StoreError::SchemaVersion {
            found: envelope.schema_version,
            expected: CONTEXT_SCHEMA_VERSION,
        });
    }
    Ok(envelope.context)
}

/// Cross-turn call state storage.
///
/// No operation provides mutual exclusion; the engine assumes turns for one
/// call never overlap in time.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Create and persist a fresh context for a call.
    async fn init(
        &self,
        call_id: &str,
        company_id: &str,
        trade: &str,
        config_version: &str,
    ) -> Result<CallContext, StoreError>;

    /// Load the context for a call. Expired or version-mismatched entries
    /// behave as absent.
    async fn load(&self, call_id: &str) -> Result<Option<CallContext>, StoreError>;

    /// Persist the context, refreshing its expiry and bumping `updated_at`
    /// on the caller's copy so a subsequent load round-trips exactly.
    async fn save(&self, context: &mut CallContext) -> Result<(), StoreError>;

    /// Remove the context. Called only after the call has been archived.
    async fn delete(&self, call_id: &str) -> Result<(), StoreError>;
}

/// Default implementation detail shared by implementations: stamp the
/// context before persisting.
pub(crate) fn touch(context: &mut CallContext) {
    context.updated_at = Utc::now();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_round_trip() {
        let ctx = CallContext::new("call-1", "co-1", "hvac", "v1");
        let payload = encode_context(&ctx).unwrap();
        let back = decode_context(&payload).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn test_unknown_schema_version_rejected() {
        let ctx = CallContext::new("call-1", "co-1", "hvac", "v1");
        let payload = encode_context(&ctx).unwrap();
        let bumped = payload.replacen(
            &format!("\"schema_version\":{}", CONTEXT_SCHEMA_VERSION),
            "\"schema_version\":999",
            1,
        );

        match decode_context(&bumped) {
            Err(StoreError::SchemaVersion { found, .. }) => assert_eq!(found, 999),
            other => panic!("expected schema version error, got {:?}", other),
        }
    }
}
