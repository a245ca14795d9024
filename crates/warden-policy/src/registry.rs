//! The agent registry and its TOML configuration schema.
//!
//! A `RegistryConfig` is deserialized from TOML and validated once by
//! `AgentRegistry::from_config`. The resulting registry is immutable; a
//! lifecycle change produces a new registry value through the
//! `LifecycleGovernor`.
//!
//! Example:
//! ```toml
//! policy_version = "2026.03"
//!
//! [[agents]]
//! agent_id = "consent-agent"
//! agent_type = "clinical"
//! allowed_scopes = ["consent.read", "consent.write"]
//!
//! [[versions]]
//! agent_id = "consent-agent"
//! version = "1.0.0"
//! lifecycle_state = "active"
//!
//! [tools]
//! "consent.recordDecision" = "consent.write"
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use warden_contracts::{
    agent::{AgentDeclaration, AgentId, AgentType, AgentVersion, LifecycleState, Scope},
    error::{WardenError, WardenResult},
};

/// One `[[versions]]` entry.
///
/// `allowed_scopes` defaults to the full declared scope set of the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionConfig {
    pub agent_id: AgentId,
    pub version: String,
    pub lifecycle_state: LifecycleState,
    #[serde(default)]
    pub allowed_scopes: Option<BTreeSet<Scope>>,
}

/// The top-level structure deserialized from a registry TOML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    pub policy_version: String,
    #[serde(default)]
    pub agents: Vec<AgentDeclaration>,
    #[serde(default)]
    pub versions: Vec<VersionConfig>,
    /// Tool name → the single scope required to call it.
    #[serde(default)]
    pub tools: BTreeMap<String, Scope>,
}

/// The validated, immutable agent/version/tool registry.
///
/// All maps are ordered, so iteration is `agent_id` ascending then `version`
/// ascending (string compare). Downstream pagination depends on that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRegistry {
    policy_version: String,
    declarations: BTreeMap<AgentId, AgentDeclaration>,
    versions: BTreeMap<AgentId, BTreeMap<String, AgentVersion>>,
    tools: BTreeMap<String, Scope>,
}

impl AgentRegistry {
    /// Validate `config` and build the registry.
    ///
    /// Returns `WardenError::RegistryViolation` on duplicate agents or
    /// versions, versions of undeclared agents, version scopes outside the
    /// declared scope set, or empty identifiers.
    pub fn from_config(config: RegistryConfig) -> WardenResult<Self> {
        if config.policy_version.trim().is_empty() {
            return Err(violation("policy_version must not be empty"));
        }

        let mut declarations = BTreeMap::new();
        for declaration in config.agents {
            if declaration.agent_id.as_str().trim().is_empty() {
                return Err(violation("agent_id must not be empty"));
            }
            let id = declaration.agent_id.clone();
            if declarations.insert(id.clone(), declaration).is_some() {
                return Err(violation(format!("agent '{id}' is declared more than once")));
            }
        }

        let mut versions: BTreeMap<AgentId, BTreeMap<String, AgentVersion>> = BTreeMap::new();
        for entry in config.versions {
            let declaration = declarations.get(&entry.agent_id).ok_or_else(|| {
                violation(format!(
                    "version '{}' references undeclared agent '{}'",
                    entry.version, entry.agent_id
                ))
            })?;

            if entry.version.trim().is_empty() {
                return Err(violation(format!(
                    "agent '{}' has a version with an empty name",
                    entry.agent_id
                )));
            }

            let allowed_scopes = entry
                .allowed_scopes
                .unwrap_or_else(|| declaration.allowed_scopes.clone());
            if let Some(extra) = allowed_scopes
                .iter()
                .find(|s| !declaration.allowed_scopes.contains(*s))
            {
                return Err(violation(format!(
                    "version '{}@{}' holds scope '{}' outside the declared scope set",
                    entry.agent_id, entry.version, extra
                )));
            }

            let version = AgentVersion {
                agent_id: entry.agent_id.clone(),
                version: entry.version.clone(),
                lifecycle_state: entry.lifecycle_state,
                allowed_scopes,
            };

            let per_agent = versions.entry(entry.agent_id.clone()).or_default();
            if per_agent.insert(entry.version.clone(), version).is_some() {
                return Err(violation(format!(
                    "version '{}@{}' is registered more than once",
                    entry.agent_id, entry.version
                )));
            }
        }

        if let Some(tool) = config.tools.keys().find(|t| t.trim().is_empty()) {
            return Err(violation(format!("tool name '{tool}' is empty")));
        }

        debug!(
            policy_version = %config.policy_version,
            agents = declarations.len(),
            tools = config.tools.len(),
            "agent registry validated"
        );

        Ok(Self {
            policy_version: config.policy_version,
            declarations,
            versions,
            tools: config.tools,
        })
    }

    /// Parse `s` as TOML and build a registry.
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        let config: RegistryConfig = toml::from_str(s).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to parse registry TOML: {}", e),
        })?;
        Self::from_config(config)
    }

    /// Read the file at `path` and parse it as a registry TOML document.
    pub fn from_file(path: &Path) -> WardenResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to read registry file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn policy_version(&self) -> &str {
        &self.policy_version
    }

    pub fn declaration(&self, agent_id: &str) -> Option<&AgentDeclaration> {
        self.declarations.get(agent_id)
    }

    pub fn agent_type(&self, agent_id: &str) -> AgentType {
        self.declaration(agent_id)
            .map(|d| d.agent_type)
            .unwrap_or(AgentType::Unknown)
    }

    pub fn version(&self, agent_id: &str, version: &str) -> Option<&AgentVersion> {
        self.versions.get(agent_id).and_then(|v| v.get(version))
    }

    /// The scope `tool_name` requires, or `None` for an unmapped tool.
    pub fn required_scope(&self, tool_name: &str) -> Option<&Scope> {
        self.tools.get(tool_name)
    }

    /// Declarations in `agent_id` order.
    pub fn declarations(&self) -> impl Iterator<Item = &AgentDeclaration> {
        self.declarations.values()
    }

    /// Versions in `agent_id`, then `version` order.
    pub fn versions(&self) -> impl Iterator<Item = &AgentVersion> {
        self.versions.values().flat_map(|v| v.values())
    }

    /// Tool → scope map in tool-name order.
    pub fn tools(&self) -> &BTreeMap<String, Scope> {
        &self.tools
    }

    pub fn agent_count(&self) -> usize {
        self.declarations.len()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// A copy of this registry with one version moved to `state`.
    ///
    /// Does not validate the transition; that is the governor's job.
    pub(crate) fn with_lifecycle_state(
        &self,
        agent_id: &str,
        version: &str,
        state: LifecycleState,
    ) -> WardenResult<Self> {
        let mut next = self.clone();
        let entry = next
            .versions
            .get_mut(agent_id)
            .and_then(|v| v.get_mut(version))
            .ok_or_else(|| violation(format!("unknown version '{agent_id}@{version}'")))?;
        entry.lifecycle_state = state;
        Ok(next)
    }
}

fn violation(reason: impl Into<String>) -> WardenError {
    WardenError::RegistryViolation {
        reason: reason.into(),
    }
}
