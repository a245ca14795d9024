//! Reason codes and governance decision types.
//!
//! Every code the control plane can attach to a decision, rejection, or
//! signal is a variant of the closed `ReasonCode` enum. Consumers match on it
//! exhaustively; there is no string-keyed lookup anywhere in the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agent::AgentType;

/// The closed vocabulary of reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    // Governance denials.
    UnknownAgent,
    UnknownAgentVersion,
    UnknownTool,
    ScopeDenied,
    LifecycleDenied,

    // Governance warning.
    DeprecatedAgent,

    // Tool-level outcomes reported by the surrounding gateway.
    FeatureDisabled,
    ValidationFailed,
    RateLimited,

    // Operator API rejections.
    UnknownPolicyId,
    UnknownViewId,
    UnsupportedTarget,
    InternalError,

    // Mutation gateway rejections.
    UnknownVersion,
    ApprovalRequired,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::UnknownAgent => "UNKNOWN_AGENT",
            ReasonCode::UnknownAgentVersion => "UNKNOWN_AGENT_VERSION",
            ReasonCode::UnknownTool => "UNKNOWN_TOOL",
            ReasonCode::ScopeDenied => "SCOPE_DENIED",
            ReasonCode::LifecycleDenied => "LIFECYCLE_DENIED",
            ReasonCode::DeprecatedAgent => "DEPRECATED_AGENT",
            ReasonCode::FeatureDisabled => "FEATURE_DISABLED",
            ReasonCode::ValidationFailed => "VALIDATION_FAILED",
            ReasonCode::RateLimited => "RATE_LIMITED",
            ReasonCode::UnknownPolicyId => "UNKNOWN_POLICY_ID",
            ReasonCode::UnknownViewId => "UNKNOWN_VIEW_ID",
            ReasonCode::UnsupportedTarget => "UNSUPPORTED_TARGET",
            ReasonCode::InternalError => "INTERNAL_ERROR",
            ReasonCode::UnknownVersion => "UNKNOWN_VERSION",
            ReasonCode::ApprovalRequired => "APPROVAL_REQUIRED",
        }
    }

    /// True for codes that indicate a broken policy/view catalog rather than
    /// a caller mistake.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            ReasonCode::UnknownPolicyId | ReasonCode::UnknownViewId | ReasonCode::UnsupportedTarget
        )
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of `PolicyEvaluator::evaluate`.
///
/// A denial is a value, not an error. `warning_code` is only ever set on an
/// allowed decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<ReasonCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_code: Option<ReasonCode>,
    pub agent_type: AgentType,
}

impl GovernanceDecision {
    pub fn allow(agent_type: AgentType) -> Self {
        Self {
            allowed: true,
            reason_code: None,
            warning_code: None,
            agent_type,
        }
    }

    pub fn allow_with_warning(warning: ReasonCode, agent_type: AgentType) -> Self {
        Self {
            allowed: true,
            reason_code: None,
            warning_code: Some(warning),
            agent_type,
        }
    }

    pub fn deny(reason: ReasonCode, agent_type: AgentType) -> Self {
        Self {
            allowed: false,
            reason_code: Some(reason),
            warning_code: None,
            agent_type,
        }
    }

    /// The governance outcome this decision produces on the timeline, if any.
    ///
    /// Clean allows produce nothing.
    pub fn outcome(&self) -> Option<(GovernanceOutcomeKind, ReasonCode)> {
        match (self.allowed, self.reason_code, self.warning_code) {
            (false, Some(code), _) => Some((GovernanceOutcomeKind::Denied, code)),
            (true, _, Some(code)) => Some((GovernanceOutcomeKind::Warning, code)),
            _ => None,
        }
    }
}

/// Whether a governance control denied the call or let it through with a
/// warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GovernanceOutcomeKind {
    Denied,
    Warning,
}

/// Result of `validate_transition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<ReasonCode>,
}

impl TransitionDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason_code: None,
        }
    }

    pub fn denied() -> Self {
        Self {
            allowed: false,
            reason_code: Some(ReasonCode::LifecycleDenied),
        }
    }
}

/// Tag carried by every lifecycle telemetry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionStatus {
    Requested,
    Approved,
    Rejected,
}

/// Escalation severity shared by abuse and approval signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
