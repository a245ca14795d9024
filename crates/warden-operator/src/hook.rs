//! Decision hooks: escalation advice attached to execution results.

use serde::Serialize;

use warden_contracts::governance::ReasonCode;

use crate::{catalog::RiskTier, dto::ExecutionOutcome};

/// What a hook sees about one finished execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionContext {
    /// `None` when the policy could not be resolved.
    pub risk_tier: Option<RiskTier>,
    pub outcome: ExecutionOutcome,
    pub reason_code: Option<ReasonCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewAction {
    SecurityReview,
    ComplianceReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSeverity {
    Critical,
    Warning,
}

/// Wire shape: `{"kind", "severity", "reasonCode"}`. `reasonCode` is the
/// execution's own code, `null` on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookDecision {
    pub kind: ReviewAction,
    pub severity: ReviewSeverity,
    pub reason_code: Option<ReasonCode>,
}

/// Pluggable post-execution advice. Must be pure and cheap; it runs on the
/// request path.
pub trait DecisionHook: Send + Sync {
    fn decide(&self, context: &DecisionContext) -> Option<HookDecision>;
}

/// High-risk errors go to security review; misconfiguration goes to
/// compliance review; everything else gets no decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDecisionHook;

impl DecisionHook for DefaultDecisionHook {
    fn decide(&self, context: &DecisionContext) -> Option<HookDecision> {
        if context.risk_tier == Some(RiskTier::High) && context.outcome == ExecutionOutcome::Error {
            return Some(HookDecision {
                kind: ReviewAction::SecurityReview,
                severity: ReviewSeverity::Critical,
                reason_code: context.reason_code,
            });
        }
        if context.reason_code.is_some_and(|r| r.is_misconfiguration()) {
            return Some(HookDecision {
                kind: ReviewAction::ComplianceReview,
                severity: ReviewSeverity::Warning,
                reason_code: context.reason_code,
            });
        }
        None
    }
}
