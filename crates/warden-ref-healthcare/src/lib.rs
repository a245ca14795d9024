//! # warden-ref-healthcare
//!
//! Healthcare reference runtime for the WARDEN agent governance control plane.
//!
//! Demonstrates three scenarios over a fictional clinic's agent registry:
//!
//! 1. **Governance Decisions**: scope, lifecycle and deprecation checks on
//!    simulated tool calls, with the approval and abuse signals they raise.
//! 2. **Operator Console**: sanitized timeline reads, registry joins and
//!    audited policy executions over the traffic from scenario 1.
//! 3. **Mutation Idempotency**: approved consent writes through the mutation
//!    gateway, including replays, collisions and executor failure.
//!
//! All data is hardcoded and fictional. No external API calls are made.

use tracing::debug;

use warden_contracts::error::WardenResult;
use warden_policy::AgentRegistry;

pub mod mock_data;
pub mod scenarios;

/// The reference clinic's agent registry, as shipped.
pub const REFERENCE_REGISTRY: &str = include_str!("../registry/agents.toml");

/// Parse [`REFERENCE_REGISTRY`].
pub fn reference_registry() -> WardenResult<AgentRegistry> {
    let registry = AgentRegistry::from_toml_str(REFERENCE_REGISTRY)?;
    debug!(policy_version = registry.policy_version(), "reference registry loaded");
    Ok(registry)
}
