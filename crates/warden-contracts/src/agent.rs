//! Agent identity, scope, and lifecycle types.
//!
//! Agents are autonomous callers, never human actors. Declarations are fixed
//! at process start; the lifecycle state of a version is the only attribute a
//! governance action may change.

use std::{borrow::Borrow, collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

/// Stable, human-readable identifier for a registered agent.
///
/// Example: AgentId("consent-agent")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AgentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A coarse permission token required by a tool.
///
/// Scope names are namespaced by resource: "consent.write", "chat.write".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(pub String);

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The declared category of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    PatientFacing,
    Clinical,
    Platform,
    Unknown,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::PatientFacing => "patient-facing",
            AgentType::Clinical => "clinical",
            AgentType::Platform => "platform",
            AgentType::Unknown => "unknown",
        }
    }
}

/// Governance status of an agent version.
///
/// `Retired` is terminal. Transitions are validated by the lifecycle state
/// machine in `warden-policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Experimental,
    Active,
    Deprecated,
    Disabled,
    Retired,
}

impl LifecycleState {
    /// Every state, in declaration order.
    pub const ALL: [LifecycleState; 5] = [
        LifecycleState::Experimental,
        LifecycleState::Active,
        LifecycleState::Deprecated,
        LifecycleState::Disabled,
        LifecycleState::Retired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Experimental => "experimental",
            LifecycleState::Active => "active",
            LifecycleState::Deprecated => "deprecated",
            LifecycleState::Disabled => "disabled",
            LifecycleState::Retired => "retired",
        }
    }

    /// True for states in which the version may not execute at all.
    pub fn blocks_execution(&self) -> bool {
        matches!(self, LifecycleState::Disabled | LifecycleState::Retired)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An agent as registered at process start. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDeclaration {
    pub agent_id: AgentId,
    pub agent_type: AgentType,
    /// Upper bound for the scopes any version of this agent may hold.
    #[serde(default)]
    pub allowed_scopes: BTreeSet<Scope>,
}

/// One deployable version of a declared agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentVersion {
    pub agent_id: AgentId,
    pub version: String,
    pub lifecycle_state: LifecycleState,
    /// Scopes this version actually holds; a subset of the declaration's.
    #[serde(default)]
    pub allowed_scopes: BTreeSet<Scope>,
}

impl AgentVersion {
    pub fn has_scope(&self, scope: &Scope) -> bool {
        self.allowed_scopes.contains(scope)
    }
}
