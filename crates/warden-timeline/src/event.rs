//! The sanitized timeline event union.
//!
//! A `TimelineEvent` can only be built inside this crate, by the aggregator.
//! It has no field for tenant ids, actor ids, request ids, idempotency keys,
//! or payloads, so none can leak through it.

use serde::Serialize;

use warden_contracts::{
    agent::LifecycleState,
    cursor::Cursor,
    governance::{GovernanceOutcomeKind, ReasonCode, Severity, TransitionStatus},
    telemetry::{TimelineEventType, ToolErrorCode, ToolOutcome},
};

/// Type-specific fields, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineDetail {
    #[serde(rename_all = "camelCase")]
    ToolGateway {
        tool_name: String,
        outcome: ToolOutcome,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ToolErrorCode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    GovernanceControl {
        tool_name: String,
        decision: GovernanceOutcomeKind,
        reason_code: ReasonCode,
    },
    #[serde(rename_all = "camelCase")]
    ApprovalSignal {
        tool_name: String,
        decision: GovernanceOutcomeKind,
        reason_code: ReasonCode,
        severity: Severity,
        escalation_level: u8,
    },
    #[serde(rename_all = "camelCase")]
    LifecycleTransition {
        from_state: Option<LifecycleState>,
        to_state: LifecycleState,
        status: TransitionStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason_code: Option<ReasonCode>,
    },
}

impl TimelineDetail {
    pub fn event_type(&self) -> TimelineEventType {
        match self {
            TimelineDetail::ToolGateway { .. } => TimelineEventType::ToolGateway,
            TimelineDetail::GovernanceControl { .. } => TimelineEventType::GovernanceControl,
            TimelineDetail::ApprovalSignal { .. } => TimelineEventType::ApprovalSignal,
            TimelineDetail::LifecycleTransition { .. } => TimelineEventType::LifecycleTransition,
        }
    }

    /// The allow-listed tool name, for the variants that carry one.
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            TimelineDetail::ToolGateway { tool_name, .. }
            | TimelineDetail::GovernanceControl { tool_name, .. }
            | TimelineDetail::ApprovalSignal { tool_name, .. } => Some(tool_name),
            TimelineDetail::LifecycleTransition { .. } => None,
        }
    }
}

/// One entry of the unified timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    event_id: String,
    policy_snapshot_hash: String,
    agent_version: String,
    /// RFC 3339, UTC, millisecond precision. Sorts lexicographically.
    timestamp: String,
    #[serde(flatten)]
    detail: TimelineDetail,
}

impl TimelineEvent {
    pub(crate) fn new(
        event_id: String,
        policy_snapshot_hash: String,
        agent_version: String,
        timestamp: String,
        detail: TimelineDetail,
    ) -> Self {
        Self {
            event_id,
            policy_snapshot_hash,
            agent_version,
            timestamp,
            detail,
        }
    }

    pub(crate) fn set_event_id(&mut self, event_id: String) {
        self.event_id = event_id;
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn policy_snapshot_hash(&self) -> &str {
        &self.policy_snapshot_hash
    }

    pub fn agent_version(&self) -> &str {
        &self.agent_version
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn detail(&self) -> &TimelineDetail {
        &self.detail
    }

    pub fn event_type(&self) -> TimelineEventType {
        self.detail.event_type()
    }

    /// Position of this event in chronological order.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.timestamp.clone(), self.event_id.clone())
    }
}
