//! Lifecycle state machine and governor.
//!
//! Allowed transitions (explicit allow-list):
//!
//! ```text
//! experimental → active
//! active       → deprecated | disabled
//! deprecated   → retired | disabled
//! x            → x            (identity, no-op)
//! ```
//!
//! Every other pair is denied with `LIFECYCLE_DENIED`. Nothing ever leaves
//! `retired` or `disabled`, and `active` never goes back to `experimental`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use warden_contracts::{
    agent::LifecycleState,
    governance::{ReasonCode, TransitionDecision, TransitionStatus},
    telemetry::{RawEvent, RawLifecycleEvent},
};
use warden_core::{contained::record_telemetry, traits::TelemetrySink};

use crate::{registry::AgentRegistry, snapshot::policy_hash};

/// Validate a single lifecycle transition against the allow-list.
pub fn validate_transition(from: LifecycleState, to: LifecycleState) -> TransitionDecision {
    use LifecycleState::*;

    let allowed = from == to
        || matches!(
            (from, to),
            (Experimental, Active)
                | (Active, Deprecated)
                | (Active, Disabled)
                | (Deprecated, Retired)
                | (Deprecated, Disabled)
        );

    if allowed {
        TransitionDecision::allowed()
    } else {
        TransitionDecision::denied()
    }
}

/// A governance request to move one agent version to a new state.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub agent_id: String,
    pub version: String,
    pub to: LifecycleState,
    /// Who asked. Recorded in raw telemetry only; stripped from the timeline.
    pub requested_by: Option<String>,
    pub request_id: Option<String>,
}

/// What the governor decided, plus the new registry when the change applied.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub decision: TransitionDecision,
    pub registry: Option<AgentRegistry>,
}

/// Applies validated lifecycle transitions and records every attempt.
///
/// Each attempt produces a `requested` telemetry record followed by exactly
/// one `approved` or `rejected` record. An attempt on a version the registry
/// does not hold is recorded without a `fromState`. Telemetry failures are
/// logged and never change the decision.
pub struct LifecycleGovernor {
    sink: Arc<dyn TelemetrySink>,
}

impl LifecycleGovernor {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink }
    }

    pub fn request_transition(
        &self,
        registry: &AgentRegistry,
        request: &TransitionRequest,
    ) -> TransitionOutcome {
        let Some(current) = registry.version(&request.agent_id, &request.version) else {
            let reason = if registry.declaration(&request.agent_id).is_none() {
                ReasonCode::UnknownAgent
            } else {
                ReasonCode::UnknownAgentVersion
            };
            warn!(
                agent_id = %request.agent_id,
                version = %request.version,
                reason = %reason,
                "lifecycle transition requested for unknown version"
            );
            let hash = policy_hash(registry);
            self.record(request, None, TransitionStatus::Requested, None, &hash);
            self.record(request, None, TransitionStatus::Rejected, Some(reason), &hash);
            return TransitionOutcome {
                decision: TransitionDecision {
                    allowed: false,
                    reason_code: Some(reason),
                },
                registry: None,
            };
        };

        let from = current.lifecycle_state;
        let before_hash = policy_hash(registry);
        self.record(request, Some(from), TransitionStatus::Requested, None, &before_hash);

        let decision = validate_transition(from, request.to);
        if !decision.allowed {
            warn!(
                agent_id = %request.agent_id,
                version = %request.version,
                from = %from,
                to = %request.to,
                "lifecycle transition rejected"
            );
            self.record(
                request,
                Some(from),
                TransitionStatus::Rejected,
                decision.reason_code,
                &before_hash,
            );
            return TransitionOutcome {
                decision,
                registry: None,
            };
        }

        let next = match registry.with_lifecycle_state(&request.agent_id, &request.version, request.to) {
            Ok(next) => next,
            Err(e) => {
                // The version was found above, so this only fires on a broken registry.
                warn!(error = %e, "lifecycle transition could not be applied");
                let decision = TransitionDecision::denied();
                self.record(
                    request,
                    Some(from),
                    TransitionStatus::Rejected,
                    decision.reason_code,
                    &before_hash,
                );
                return TransitionOutcome {
                    decision,
                    registry: None,
                };
            }
        };

        let after_hash = policy_hash(&next);
        info!(
            agent_id = %request.agent_id,
            version = %request.version,
            from = %from,
            to = %request.to,
            "lifecycle transition approved"
        );
        self.record(request, Some(from), TransitionStatus::Approved, None, &after_hash);

        TransitionOutcome {
            decision,
            registry: Some(next),
        }
    }

    fn record(
        &self,
        request: &TransitionRequest,
        from: Option<LifecycleState>,
        status: TransitionStatus,
        reason_code: Option<ReasonCode>,
        snapshot_hash: &str,
    ) {
        let event = RawEvent::LifecycleTransition(RawLifecycleEvent {
            request_id: request.request_id.clone(),
            actor_id: request.requested_by.clone(),
            agent_id: request.agent_id.clone(),
            agent_version: request.version.clone(),
            policy_snapshot_hash: snapshot_hash.to_string(),
            from_state: from,
            to_state: request.to,
            status,
            reason_code,
            timestamp: Utc::now(),
        });
        record_telemetry(self.sink.as_ref(), event);
    }
}
