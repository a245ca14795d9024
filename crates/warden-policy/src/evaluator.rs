//! The tool policy evaluator.
//!
//! Evaluation order is fixed and every branch returns a value; there is no
//! error path:
//!
//! 1. Unknown agent                        → deny `UNKNOWN_AGENT`
//! 2. Unknown version                      → deny `UNKNOWN_AGENT_VERSION`
//! 3. Unmapped tool                        → deny `UNKNOWN_TOOL`
//! 4. Required scope not held by version   → deny `SCOPE_DENIED`
//! 5. Version disabled or retired          → deny `LIFECYCLE_DENIED`
//! 6. Version deprecated                   → allow, warn `DEPRECATED_AGENT`
//! 7. Otherwise                            → allow

use std::sync::Arc;

use tracing::{debug, warn};

use warden_contracts::{
    agent::{AgentType, LifecycleState},
    governance::{GovernanceDecision, ReasonCode},
};

use crate::registry::AgentRegistry;

/// Pure evaluator over an immutable registry.
///
/// Repeated calls with the same arguments against the same registry return
/// identical decisions.
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    registry: Arc<AgentRegistry>,
}

impl PolicyEvaluator {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Decide whether `agent_id@agent_version` may call `tool_name`.
    pub fn evaluate(&self, agent_id: &str, agent_version: &str, tool_name: &str) -> GovernanceDecision {
        let decision = self.decide(agent_id, agent_version, tool_name);

        if decision.allowed {
            debug!(
                agent_id,
                agent_version,
                tool_name,
                warning = ?decision.warning_code,
                "tool call allowed"
            );
        } else {
            warn!(
                agent_id,
                agent_version,
                tool_name,
                reason = ?decision.reason_code,
                "tool call denied"
            );
        }

        decision
    }

    fn decide(&self, agent_id: &str, agent_version: &str, tool_name: &str) -> GovernanceDecision {
        let Some(declaration) = self.registry.declaration(agent_id) else {
            return GovernanceDecision::deny(ReasonCode::UnknownAgent, AgentType::Unknown);
        };
        let agent_type = declaration.agent_type;

        let Some(version) = self.registry.version(agent_id, agent_version) else {
            return GovernanceDecision::deny(ReasonCode::UnknownAgentVersion, agent_type);
        };

        let Some(scope) = self.registry.required_scope(tool_name) else {
            return GovernanceDecision::deny(ReasonCode::UnknownTool, agent_type);
        };

        if !version.has_scope(scope) {
            return GovernanceDecision::deny(ReasonCode::ScopeDenied, agent_type);
        }

        match version.lifecycle_state {
            LifecycleState::Disabled | LifecycleState::Retired => {
                GovernanceDecision::deny(ReasonCode::LifecycleDenied, agent_type)
            }
            LifecycleState::Deprecated => {
                GovernanceDecision::allow_with_warning(ReasonCode::DeprecatedAgent, agent_type)
            }
            LifecycleState::Experimental | LifecycleState::Active => {
                GovernanceDecision::allow(agent_type)
            }
        }
    }
}
