//! Policy snapshot type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A hash-stamped, point-in-time summary of the agent registry.
///
/// `policy_hash` depends only on registry content and is the value used to
/// correlate decisions with the ruleset in force. `snapshot_id` is fresh on
/// every generation and must never be used for equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySnapshot {
    pub snapshot_id: Uuid,
    pub policy_version: String,
    pub policy_hash: String,
    pub agent_count: usize,
    pub tool_count: usize,
    pub generated_at: DateTime<Utc>,
}
