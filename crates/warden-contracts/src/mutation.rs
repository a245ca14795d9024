//! Mutation command and result types for the mutation gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::governance::ReasonCode;

/// Evidence that a human approved the mutation before it was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApprovalRecord {
    pub approval_id: String,
    pub approver_role: String,
    pub approved_at: DateTime<Utc>,
}

/// A request to run one mutating tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MutationCommand {
    pub tenant_id: String,
    pub actor_id: String,
    pub idempotency_key: String,
    pub tool_name: String,
    pub tool_version: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub approval: Option<ApprovalRecord>,
}

/// Terminal status of a mutation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationStatus {
    /// Dispatched and the executor reported success.
    Succeeded,
    /// Dispatched and the executor reported a terminal failure.
    Failed,
    /// Never dispatched: validation, allow-list, or approval check failed.
    Rejected,
}

/// What the gateway hands back to the caller.
///
/// Succeeded and Failed results are stored in the idempotency store and
/// replayed verbatim on retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    pub execution_id: Uuid,
    pub status: MutationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<ReasonCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl MutationResult {
    pub fn rejected(reason_code: ReasonCode) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            status: MutationStatus::Rejected,
            reason_code: Some(reason_code),
            output: None,
            timestamp: Utc::now(),
        }
    }
}
