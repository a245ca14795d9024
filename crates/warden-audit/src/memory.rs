//! In-memory `AuditEmitter`.
//!
//! `InMemoryAuditStore` keeps every record in a hash chain behind a `Mutex`.
//! It is the audit store for tests and the demo; a durable store would chain
//! the same way and persist each entry on `emit`.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use warden_contracts::{
    audit::AuditRecord,
    error::{WardenError, WardenResult},
};
use warden_core::traits::AuditEmitter;

use crate::{
    chain::{hash_entry, verify_chain},
    entry::{AuditEntry, AuditLog},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct ChainState {
    pub(crate) entries: Vec<AuditEntry>,
    pub(crate) last_hash: String,
}

// ── Public store ──────────────────────────────────────────────────────────────

pub struct InMemoryAuditStore {
    pub(crate) state: Mutex<ChainState>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                entries: Vec::new(),
                last_hash: AuditEntry::GENESIS_HASH.to_string(),
            }),
        }
    }

    fn lock(&self) -> WardenResult<MutexGuard<'_, ChainState>> {
        self.state.lock().map_err(|e| WardenError::AuditWriteFailed {
            reason: format!("audit state lock poisoned: {}", e),
        })
    }

    /// Every record in emission order.
    pub fn records(&self) -> WardenResult<Vec<AuditRecord>> {
        Ok(self.lock()?.entries.iter().map(|e| e.record.clone()).collect())
    }

    /// Records belonging to one execution, in emission order.
    pub fn records_for(&self, execution_id: Uuid) -> WardenResult<Vec<AuditRecord>> {
        Ok(self
            .lock()?
            .entries
            .iter()
            .filter(|e| e.record.execution_id == execution_id)
            .map(|e| e.record.clone())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn export_log(&self) -> WardenResult<AuditLog> {
        let state = self.lock()?;
        Ok(AuditLog {
            entries: state.entries.clone(),
            exported_at: Utc::now(),
            terminal_hash: state
                .entries
                .last()
                .map(|e| e.this_hash.clone())
                .unwrap_or_default(),
        })
    }

    /// `false` when the chain was tampered with or the lock is poisoned.
    pub fn verify_integrity(&self) -> bool {
        self.lock().map(|s| verify_chain(&s.entries)).unwrap_or(false)
    }
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditEmitter for InMemoryAuditStore {
    fn emit(&self, record: &AuditRecord) -> WardenResult<()> {
        let mut state = self.lock()?;

        let sequence = state.entries.len() as u64;
        let prev_hash = state.last_hash.clone();
        let this_hash = hash_entry(sequence, record, &prev_hash)?;

        state.entries.push(AuditEntry {
            sequence,
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.last_hash = this_hash;

        debug!(
            action = ?record.action,
            outcome = ?record.outcome,
            sequence,
            "audit record chained"
        );
        Ok(())
    }
}
