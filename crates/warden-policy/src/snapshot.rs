//! Policy snapshot generation.
//!
//! The hash commits to the registry content only: policy version, every
//! declaration, every version with its lifecycle state and scopes, and the
//! tool → scope map. The JSON is canonicalized (keys sorted) before hashing,
//! so two registries with the same content hash identically no matter when or
//! how they were built.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use warden_contracts::{
    canonical::hash_canonical_json,
    snapshot::PolicySnapshot,
};

use crate::registry::AgentRegistry;

fn registry_document(registry: &AgentRegistry) -> Value {
    let agents: Vec<Value> = registry
        .declarations()
        .map(|d| {
            json!({
                "agentId": d.agent_id.as_str(),
                "agentType": d.agent_type.as_str(),
                "allowedScopes": d.allowed_scopes.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect();

    let versions: Vec<Value> = registry
        .versions()
        .map(|v| {
            json!({
                "agentId": v.agent_id.as_str(),
                "version": v.version,
                "lifecycleState": v.lifecycle_state.as_str(),
                "allowedScopes": v.allowed_scopes.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect();

    let tools: serde_json::Map<String, Value> = registry
        .tools()
        .iter()
        .map(|(tool, scope)| (tool.clone(), Value::String(scope.as_str().to_string())))
        .collect();

    json!({
        "policyVersion": registry.policy_version(),
        "agents": agents,
        "versions": versions,
        "tools": tools,
    })
}

/// Stable SHA-256 (hex) of the registry content.
pub fn policy_hash(registry: &AgentRegistry) -> String {
    hash_canonical_json(&registry_document(registry))
}

/// Stamp the registry with a fresh snapshot id and its content hash.
pub fn generate_policy_snapshot(registry: &AgentRegistry) -> PolicySnapshot {
    PolicySnapshot {
        snapshot_id: Uuid::new_v4(),
        policy_version: registry.policy_version().to_string(),
        policy_hash: policy_hash(registry),
        agent_count: registry.agent_count(),
        tool_count: registry.tool_count(),
        generated_at: Utc::now(),
    }
}
