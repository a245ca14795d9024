//! Governance decision → approval/escalation signal mapping.
//!
//! Denials escalate by reason:
//!
//! | Reason                                              | Severity | Level |
//! |-----------------------------------------------------|----------|-------|
//! | `UNKNOWN_AGENT`, `LIFECYCLE_DENIED`                 | high     | 3     |
//! | `UNKNOWN_AGENT_VERSION`, `UNKNOWN_TOOL`, `SCOPE_DENIED`, `FEATURE_DISABLED`, `VALIDATION_FAILED`, `RATE_LIMITED` | medium | 2 |
//! | `DEPRECATED_AGENT`                                  | low      | 1     |
//!
//! Warnings are forwarded only for `DEPRECATED_AGENT` on a write tool, at
//! low/1. Everything else produces no signal.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use warden_contracts::{
    governance::{GovernanceOutcomeKind, ReasonCode, Severity},
    telemetry::{RawApprovalSignalEvent, RawEvent, RawGovernanceEvent},
};
use warden_core::{contained::record_telemetry, traits::TelemetrySink, SafeMetrics};

/// Severity and escalation level for a governance outcome, or `None` when the
/// outcome is not escalated.
pub fn classify(
    decision: GovernanceOutcomeKind,
    reason: ReasonCode,
    is_write_tool: bool,
) -> Option<(Severity, u8)> {
    use ReasonCode::*;

    match decision {
        GovernanceOutcomeKind::Warning => {
            (reason == DeprecatedAgent && is_write_tool).then_some((Severity::Low, 1))
        }
        GovernanceOutcomeKind::Denied => match reason {
            UnknownAgent | LifecycleDenied => Some((Severity::High, 3)),
            UnknownAgentVersion | UnknownTool | ScopeDenied | FeatureDisabled
            | ValidationFailed | RateLimited => Some((Severity::Medium, 2)),
            DeprecatedAgent => Some((Severity::Low, 1)),
            UnknownPolicyId | UnknownViewId | UnsupportedTarget | InternalError
            | UnknownVersion | ApprovalRequired => None,
        },
    }
}

/// Classifies tools that change state by the verb in their method name.
///
/// A tool name is `<service>.<method>`; only the method is matched. A prefix
/// matches at a word boundary (`record` matches `recordDecision` and
/// `record`, not `records`), a suffix matches the tail of the method
/// (`Update` matches `consentUpdate`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WriteTools {
    prefixes: Vec<String>,
    suffixes: Vec<String>,
}

impl WriteTools {
    pub fn new<P, S>(prefixes: P, suffixes: S) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }

    /// The common mutating verbs.
    pub fn standard() -> Self {
        Self::new(
            [
                "send", "book", "record", "update", "create", "delete", "cancel", "submit",
                "revoke",
            ],
            ["Update", "Write", "Delete"],
        )
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        let method = tool_name.rsplit_once('.').map_or(tool_name, |(_, m)| m);
        self.prefixes.iter().any(|p| {
            method
                .strip_prefix(p.as_str())
                .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_lowercase()))
        }) || self
            .suffixes
            .iter()
            .any(|s| method.len() > s.len() && method.ends_with(s.as_str()))
    }
}

/// Turns governance events into approval signals and records them.
pub struct ApprovalSignalEngine {
    write_tools: WriteTools,
    sink: Arc<dyn TelemetrySink>,
    metrics: SafeMetrics,
}

impl ApprovalSignalEngine {
    pub fn new(write_tools: WriteTools, sink: Arc<dyn TelemetrySink>, metrics: SafeMetrics) -> Self {
        Self {
            write_tools,
            sink,
            metrics,
        }
    }

    /// Map `event` to a signal and record it.
    ///
    /// Returns the signal that was handed to the sink, if any. A sink failure
    /// is logged and the signal is still returned.
    pub fn process(&self, event: &RawGovernanceEvent) -> Option<RawApprovalSignalEvent> {
        let is_write = self.write_tools.contains(&event.tool_name);
        let Some((severity, level)) = classify(event.decision, event.reason_code, is_write) else {
            debug!(
                decision = ?event.decision,
                reason = %event.reason_code,
                tool = %event.tool_name,
                "governance outcome not escalated"
            );
            return None;
        };

        let signal = RawApprovalSignalEvent {
            request_id: event.request_id.clone(),
            tenant_id: event.tenant_id.clone(),
            actor_id: event.actor_id.clone(),
            agent_id: event.agent_id.clone(),
            agent_version: event.agent_version.clone(),
            policy_snapshot_hash: event.policy_snapshot_hash.clone(),
            tool_name: event.tool_name.clone(),
            decision: event.decision,
            reason_code: event.reason_code,
            severity,
            escalation_level: level,
            timestamp: event.timestamp,
        };

        info!(
            reason = %signal.reason_code,
            severity = %severity,
            level,
            tool = %signal.tool_name,
            "approval signal raised"
        );
        self.metrics.increment(
            "approval_signal_emitted",
            1,
            &[("severity", severity.as_str())],
        );
        record_telemetry(self.sink.as_ref(), RawEvent::ApprovalSignal(signal.clone()));
        Some(signal)
    }
}
