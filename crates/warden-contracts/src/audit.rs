//! Audit record types.
//!
//! Every operator execution and every mutation state change produces an
//! `AuditRecord`. The audit sink is the only destination allowed to receive a
//! mutation payload; log lines never do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::governance::ReasonCode;

/// What was audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    PolicyExecute,
    ViewExecute,
    TimelineRead,
    AgentsRead,
    EnrichedTimelineRead,
    MutationReceived,
    MutationDispatched,
    MutationSucceeded,
    MutationFailed,
    MutationRejected,
    MutationReplayed,
}

/// Whether the audited operation was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Allowed,
    Rejected,
}

/// One immutable audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub action: AuditAction,
    pub outcome: AuditOutcome,
    /// Policy id, view id, or tool name the record is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<ReasonCode>,
    pub execution_id: Uuid,
    /// Structured detail. Mutation records may carry the command payload here.
    #[serde(default)]
    pub detail: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(action: AuditAction, outcome: AuditOutcome, execution_id: Uuid) -> Self {
        Self {
            action,
            outcome,
            target_id: None,
            reason_code: None,
            execution_id,
            detail: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_reason(mut self, reason_code: Option<ReasonCode>) -> Self {
        self.reason_code = reason_code;
        self
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}
