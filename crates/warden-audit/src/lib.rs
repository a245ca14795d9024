//! # warden-audit
//!
//! Append-only, SHA-256 hash-chained audit store.
//!
//! Each `AuditRecord` emitted by the operator API or the mutation gateway is
//! wrapped in an [`AuditEntry`] linked to its predecessor by hash. Changing
//! a single byte of any stored record is detected by [`verify_chain`].
//!
//! ```rust,ignore
//! use warden_audit::InMemoryAuditStore;
//! use warden_core::traits::AuditEmitter;
//!
//! let store = InMemoryAuditStore::new();
//! store.emit(&record)?;
//! assert!(store.verify_integrity());
//! let log = store.export_log()?;
//! ```

pub mod chain;
pub mod entry;
pub mod memory;

pub use chain::{hash_entry, verify_chain};
pub use entry::{AuditEntry, AuditLog};
pub use memory::InMemoryAuditStore;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use warden_contracts::{
        audit::{AuditAction, AuditOutcome, AuditRecord},
        governance::ReasonCode,
    };
    use warden_core::traits::AuditEmitter;

    use super::{verify_chain, AuditEntry, InMemoryAuditStore};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn record(action: AuditAction, target: &str) -> AuditRecord {
        AuditRecord::new(action, AuditOutcome::Allowed, Uuid::new_v4()).with_target(target)
    }

    fn filled_store() -> InMemoryAuditStore {
        let store = InMemoryAuditStore::new();
        store.emit(&record(AuditAction::PolicyExecute, "recent-denials")).unwrap();
        store.emit(&record(AuditAction::ViewExecute, "denials-console")).unwrap();
        store
            .emit(
                &record(AuditAction::MutationReceived, "consent.recordDecision")
                    .with_detail(json!({ "parameters": { "decision": "granted" } })),
            )
            .unwrap();
        store
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[test]
    fn chain_is_valid_after_sequential_emits() {
        assert!(filled_store().verify_integrity());
    }

    #[test]
    fn tampering_with_a_record_is_detected() {
        let store = filled_store();
        {
            let mut state = store.state.lock().unwrap();
            state.entries[2].record.detail = json!({ "parameters": { "decision": "revoked" } });
        }
        assert!(!store.verify_integrity());
    }

    #[test]
    fn rewriting_a_reason_code_is_detected() {
        let store = filled_store();
        {
            let mut state = store.state.lock().unwrap();
            state.entries[0].record.reason_code = Some(ReasonCode::UnknownPolicyId);
        }
        assert!(!store.verify_integrity());
    }

    #[test]
    fn dropping_an_entry_is_detected() {
        let log = filled_store().export_log().unwrap();
        let mut entries = log.entries.clone();
        entries.remove(1);
        assert!(!verify_chain(&entries));
    }

    #[test]
    fn first_entry_links_to_genesis() {
        let log = filled_store().export_log().unwrap();
        assert_eq!(log.entries[0].prev_hash, AuditEntry::GENESIS_HASH);
        for (idx, entry) in log.entries.iter().enumerate() {
            assert_eq!(entry.sequence, idx as u64);
        }
    }

    #[test]
    fn export_log_commits_to_last_entry() {
        let log = filled_store().export_log().unwrap();
        assert_eq!(log.entries.len(), 3);
        assert_eq!(log.terminal_hash, log.entries.last().unwrap().this_hash);
        assert!(verify_chain(&log.entries));
    }

    #[test]
    fn empty_chain_is_valid() {
        let store = InMemoryAuditStore::new();
        assert!(store.is_empty());
        assert!(store.verify_integrity());
        assert_eq!(store.export_log().unwrap().terminal_hash, "");
        assert!(verify_chain(&[]));
    }

    #[test]
    fn records_for_filters_by_execution() {
        let store = InMemoryAuditStore::new();
        let id = Uuid::new_v4();
        store
            .emit(&AuditRecord::new(AuditAction::MutationReceived, AuditOutcome::Allowed, id))
            .unwrap();
        store.emit(&record(AuditAction::PolicyExecute, "other")).unwrap();
        store
            .emit(&AuditRecord::new(AuditAction::MutationDispatched, AuditOutcome::Allowed, id))
            .unwrap();

        let actions: Vec<AuditAction> = store
            .records_for(id)
            .unwrap()
            .iter()
            .map(|r| r.action)
            .collect();
        assert_eq!(
            actions,
            vec![AuditAction::MutationReceived, AuditAction::MutationDispatched]
        );
        assert_eq!(store.records().unwrap().len(), 3);
    }
}
