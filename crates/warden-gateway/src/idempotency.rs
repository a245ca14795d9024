//! Idempotency store keyed by `(tenantId, idempotencyKey)`.
//!
//! A record is written once, after a terminal dispatch, and never replaced.
//! Replaying a key with the same payload returns the stored result. Replaying
//! it with a different payload is an `IdempotencyCollision`.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use serde_json::json;

use warden_contracts::{
    canonical::hash_canonical_json,
    error::{WardenError, WardenResult},
    mutation::{MutationCommand, MutationResult},
};

/// Hash of `(toolName, toolVersion, parameters)`.
///
/// Tenant, actor, key and approval are not part of the payload.
pub fn payload_hash(command: &MutationCommand) -> String {
    hash_canonical_json(&json!({
        "toolName": command.tool_name,
        "toolVersion": command.tool_version,
        "parameters": command.parameters,
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    pub result: MutationResult,
    pub payload_hash: String,
}

type StoreKey = (String, String);

#[derive(Debug, Default)]
pub struct IdempotencyStore {
    records: Mutex<HashMap<StoreKey, IdempotencyRecord>>,
}

impl IdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> WardenResult<MutexGuard<'_, HashMap<StoreKey, IdempotencyRecord>>> {
        self.records.lock().map_err(|e| WardenError::StoreUnavailable {
            reason: format!("idempotency store lock poisoned: {}", e),
        })
    }

    /// The stored result for this key, if the payload matches.
    pub fn get(
        &self,
        tenant_id: &str,
        idempotency_key: &str,
        payload_hash: &str,
    ) -> WardenResult<Option<MutationResult>> {
        let records = self.lock()?;
        match records.get(&(tenant_id.to_string(), idempotency_key.to_string())) {
            None => Ok(None),
            Some(record) if record.payload_hash == payload_hash => Ok(Some(record.result.clone())),
            Some(record) => Err(WardenError::IdempotencyCollision {
                stored_hash: record.payload_hash.clone(),
                received_hash: payload_hash.to_string(),
            }),
        }
    }

    /// Store the terminal result for this key.
    ///
    /// Saving the same payload twice keeps the first result.
    pub fn save(
        &self,
        tenant_id: &str,
        idempotency_key: &str,
        payload_hash: &str,
        result: MutationResult,
    ) -> WardenResult<()> {
        let mut records = self.lock()?;
        let key = (tenant_id.to_string(), idempotency_key.to_string());
        if let Some(existing) = records.get(&key) {
            if existing.payload_hash != payload_hash {
                return Err(WardenError::IdempotencyCollision {
                    stored_hash: existing.payload_hash.clone(),
                    received_hash: payload_hash.to_string(),
                });
            }
            return Ok(());
        }
        records.insert(
            key,
            IdempotencyRecord {
                result,
                payload_hash: payload_hash.to_string(),
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn clear(&self) {
        if let Ok(mut records) = self.lock() {
            records.clear();
        }
    }
}
