//! Hash-chain primitives.
//!
//! Hash input, in order:
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 (64 hex chars)
//!   3. canonical (key-sorted) JSON of the record

use sha2::{Digest, Sha256};

use warden_contracts::{
    audit::AuditRecord,
    canonical::canonical_json_string,
    error::{WardenError, WardenResult},
};

use crate::entry::AuditEntry;

/// Lowercase hex SHA-256 of one entry's content.
pub fn hash_entry(sequence: u64, record: &AuditRecord, prev_hash: &str) -> WardenResult<String> {
    let value = serde_json::to_value(record).map_err(|e| WardenError::AuditWriteFailed {
        reason: format!("audit record is not serializable: {e}"),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(canonical_json_string(&value).as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// `true` when every entry links to its predecessor (the genesis hash for the
/// first) and every `this_hash` matches its recomputed value. Sequence
/// numbers must run 0, 1, 2, … without gaps. An empty chain is valid.
pub fn verify_chain(entries: &[AuditEntry]) -> bool {
    let mut expected_prev = AuditEntry::GENESIS_HASH.to_string();

    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 || entry.prev_hash != expected_prev {
            return false;
        }
        match hash_entry(entry.sequence, &entry.record, &entry.prev_hash) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return false,
        }
        expected_prev = entry.this_hash.clone();
    }

    true
}
