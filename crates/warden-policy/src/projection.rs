//! Read-only projection of the registry for operators.
//!
//! A reader is built from one snapshot generation, so every entry it returns
//! carries the same `policy_snapshot_hash` and `last_updated_at`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use warden_contracts::{
    agent::{AgentType, LifecycleState},
    cursor::Cursor,
    snapshot::PolicySnapshot,
};

use crate::{registry::AgentRegistry, snapshot::generate_policy_snapshot};

/// One agent version as exposed to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRegistryEntry {
    pub agent_id: String,
    pub agent_version: String,
    pub agent_type: AgentType,
    pub lifecycle_state: LifecycleState,
    /// Ascending.
    pub allowed_scopes: Vec<String>,
    pub policy_snapshot_hash: String,
    pub last_updated_at: DateTime<Utc>,
}

impl AgentRegistryEntry {
    /// Position of this entry in the enumeration order.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.agent_id.clone(), self.agent_version.clone())
    }
}

pub struct AgentRegistryReader {
    snapshot: PolicySnapshot,
    entries: Vec<AgentRegistryEntry>,
}

impl AgentRegistryReader {
    pub fn new(registry: &AgentRegistry) -> Self {
        let snapshot = generate_policy_snapshot(registry);

        // registry.versions() already yields agent_id then version ascending.
        let entries = registry
            .versions()
            .map(|v| AgentRegistryEntry {
                agent_id: v.agent_id.0.clone(),
                agent_version: v.version.clone(),
                agent_type: registry.agent_type(v.agent_id.as_str()),
                lifecycle_state: v.lifecycle_state,
                allowed_scopes: v.allowed_scopes.iter().map(|s| s.0.clone()).collect(),
                policy_snapshot_hash: snapshot.policy_hash.clone(),
                last_updated_at: snapshot.generated_at,
            })
            .collect();

        Self { snapshot, entries }
    }

    pub fn snapshot(&self) -> &PolicySnapshot {
        &self.snapshot
    }

    /// Every entry in enumeration order.
    pub fn entries(&self) -> &[AgentRegistryEntry] {
        &self.entries
    }

    /// Up to `fetch` entries after `after` that satisfy `keep`.
    pub fn page<F>(&self, after: Option<&Cursor>, keep: F, fetch: usize) -> Vec<AgentRegistryEntry>
    where
        F: Fn(&AgentRegistryEntry) -> bool,
    {
        self.entries
            .iter()
            .filter(|e| after.map_or(true, |c| c.precedes(&e.agent_id, &e.agent_version)))
            .filter(|e| keep(*e))
            .take(fetch)
            .cloned()
            .collect()
    }
}
