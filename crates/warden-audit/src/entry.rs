//! Chained audit entry and exported log types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_contracts::audit::AuditRecord;

/// One link of the audit chain.
///
/// `this_hash` commits to `sequence`, `prev_hash` and the canonical JSON of
/// `record`. Editing any of them breaks the chain from this entry onward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub sequence: u64,
    pub record: AuditRecord,
    pub prev_hash: String,
    pub this_hash: String,
}

impl AuditEntry {
    /// `prev_hash` of the first entry.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// Snapshot of the whole chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub entries: Vec<AuditEntry>,
    pub exported_at: DateTime<Utc>,
    /// `this_hash` of the last entry, empty for an empty log.
    pub terminal_hash: String,
}
