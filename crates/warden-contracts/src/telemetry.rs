//! Raw telemetry shapes as stored by the external event store.
//!
//! These records are NOT safe to expose. They carry tenant and actor
//! identifiers, request ids, idempotency keys, and free-form payloads. The
//! timeline aggregator in `warden-timeline` is the only consumer allowed to
//! read them, and it strips everything outside its allow-list.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    agent::LifecycleState,
    governance::{GovernanceOutcomeKind, ReasonCode, Severity, TransitionStatus},
};

/// Discriminant of both raw events and sanitized timeline events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineEventType {
    ToolGateway,
    GovernanceControl,
    ApprovalSignal,
    LifecycleTransition,
}

impl TimelineEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineEventType::ToolGateway => "TOOL_GATEWAY",
            TimelineEventType::GovernanceControl => "GOVERNANCE_CONTROL",
            TimelineEventType::ApprovalSignal => "APPROVAL_SIGNAL",
            TimelineEventType::LifecycleTransition => "LIFECYCLE_TRANSITION",
        }
    }
}

impl fmt::Display for TimelineEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final outcome of a tool invocation as seen by the tool gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolOutcome {
    Succeeded,
    Failed,
    Denied,
    RateLimited,
}

/// Error classification attached to failed tool invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorCode {
    Forbidden,
    FeatureDisabled,
    Conflict,
    ValidationFailed,
    NotFound,
    Internal,
}

impl ToolErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorCode::Forbidden => "FORBIDDEN",
            ToolErrorCode::FeatureDisabled => "FEATURE_DISABLED",
            ToolErrorCode::Conflict => "CONFLICT",
            ToolErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ToolErrorCode::NotFound => "NOT_FOUND",
            ToolErrorCode::Internal => "INTERNAL",
        }
    }
}

/// One tool invocation recorded by the tool gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawToolGatewayEvent {
    pub request_id: String,
    pub tenant_id: String,
    pub actor_id: String,
    pub actor_type: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    pub agent_id: String,
    pub agent_version: String,
    pub policy_snapshot_hash: String,
    pub tool_name: String,
    pub outcome: ToolOutcome,
    #[serde(default)]
    pub error_code: Option<ToolErrorCode>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// A governance control firing (denial or warning) on a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGovernanceEvent {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub actor_id: Option<String>,
    pub agent_id: String,
    pub agent_version: String,
    pub policy_snapshot_hash: String,
    pub tool_name: String,
    pub decision: GovernanceOutcomeKind,
    pub reason_code: ReasonCode,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// An escalation produced by the approval signal engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawApprovalSignalEvent {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub actor_id: Option<String>,
    pub agent_id: String,
    pub agent_version: String,
    pub policy_snapshot_hash: String,
    pub tool_name: String,
    pub decision: GovernanceOutcomeKind,
    pub reason_code: ReasonCode,
    pub severity: Severity,
    pub escalation_level: u8,
    pub timestamp: DateTime<Utc>,
}

/// A lifecycle transition attempt and its status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLifecycleEvent {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub actor_id: Option<String>,
    pub agent_id: String,
    pub agent_version: String,
    pub policy_snapshot_hash: String,
    /// `None` when the version was not in the registry.
    #[serde(default)]
    pub from_state: Option<LifecycleState>,
    pub to_state: LifecycleState,
    pub status: TransitionStatus,
    #[serde(default)]
    pub reason_code: Option<ReasonCode>,
    pub timestamp: DateTime<Utc>,
}

/// Any record the event store can hand back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RawEvent {
    ToolGateway(RawToolGatewayEvent),
    GovernanceControl(RawGovernanceEvent),
    ApprovalSignal(RawApprovalSignalEvent),
    LifecycleTransition(RawLifecycleEvent),
}

impl RawEvent {
    pub fn event_type(&self) -> TimelineEventType {
        match self {
            RawEvent::ToolGateway(_) => TimelineEventType::ToolGateway,
            RawEvent::GovernanceControl(_) => TimelineEventType::GovernanceControl,
            RawEvent::ApprovalSignal(_) => TimelineEventType::ApprovalSignal,
            RawEvent::LifecycleTransition(_) => TimelineEventType::LifecycleTransition,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            RawEvent::ToolGateway(e) => e.timestamp,
            RawEvent::GovernanceControl(e) => e.timestamp,
            RawEvent::ApprovalSignal(e) => e.timestamp,
            RawEvent::LifecycleTransition(e) => e.timestamp,
        }
    }

    pub fn agent_version(&self) -> &str {
        match self {
            RawEvent::ToolGateway(e) => &e.agent_version,
            RawEvent::GovernanceControl(e) => &e.agent_version,
            RawEvent::ApprovalSignal(e) => &e.agent_version,
            RawEvent::LifecycleTransition(e) => &e.agent_version,
        }
    }
}

/// Filter handed to the timeline reader.
///
/// `from` is inclusive, `to` is exclusive. `None` means unbounded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineQuery {
    pub event_types: Option<Vec<TimelineEventType>>,
    pub agent_version: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimelineQuery {
    pub fn matches(&self, event: &RawEvent) -> bool {
        if let Some(types) = &self.event_types {
            if !types.contains(&event.event_type()) {
                return false;
            }
        }
        if let Some(version) = &self.agent_version {
            if event.agent_version() != version {
                return false;
            }
        }
        let ts = event.timestamp();
        if self.from.is_some_and(|from| ts < from) {
            return false;
        }
        if self.to.is_some_and(|to| ts >= to) {
            return false;
        }
        true
    }
}
