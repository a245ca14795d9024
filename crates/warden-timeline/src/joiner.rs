//! Timeline ⨝ registry on `(agentVersion, policySnapshotHash)`.
//!
//! The join key has no agent id because timeline events carry none. When two
//! agents share a version string under one snapshot, the one later in
//! `agentId` order wins.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use warden_contracts::agent::{AgentType, LifecycleState};
use warden_policy::AgentRegistryEntry;

use crate::event::TimelineEvent;

/// Registry metadata attached to a joined event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub agent_id: String,
    pub agent_type: AgentType,
    pub lifecycle_state: LifecycleState,
}

/// Either a registry match or the literal string `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinedAgent {
    Known(AgentSummary),
    Unknown,
}

impl Serialize for JoinedAgent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            JoinedAgent::Known(summary) => summary.serialize(serializer),
            JoinedAgent::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedTimelineEvent {
    #[serde(flatten)]
    pub event: TimelineEvent,
    pub agent: JoinedAgent,
}

/// Lookup table built once from the full registry projection.
#[derive(Debug, Clone, Default)]
pub struct TimelineJoiner {
    by_key: HashMap<(String, String), AgentSummary>,
}

impl TimelineJoiner {
    pub fn new(entries: &[AgentRegistryEntry]) -> Self {
        let mut sorted: Vec<&AgentRegistryEntry> = entries.iter().collect();
        sorted.sort_by(|a, b| {
            a.agent_id
                .cmp(&b.agent_id)
                .then_with(|| a.agent_version.cmp(&b.agent_version))
        });

        let mut by_key = HashMap::with_capacity(sorted.len());
        for entry in sorted {
            by_key.insert(
                (entry.agent_version.clone(), entry.policy_snapshot_hash.clone()),
                AgentSummary {
                    agent_id: entry.agent_id.clone(),
                    agent_type: entry.agent_type,
                    lifecycle_state: entry.lifecycle_state,
                },
            );
        }
        Self { by_key }
    }

    pub fn lookup(&self, agent_version: &str, policy_snapshot_hash: &str) -> JoinedAgent {
        self.by_key
            .get(&(agent_version.to_string(), policy_snapshot_hash.to_string()))
            .cloned()
            .map_or(JoinedAgent::Unknown, JoinedAgent::Known)
    }

    /// Attach registry metadata to each event. Order is preserved.
    pub fn join(&self, events: Vec<TimelineEvent>) -> Vec<EnrichedTimelineEvent> {
        events
            .into_iter()
            .map(|event| {
                let agent = self.lookup(event.agent_version(), event.policy_snapshot_hash());
                EnrichedTimelineEvent { event, agent }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use warden_contracts::telemetry::ToolOutcome;

    use super::*;
    use crate::event::TimelineDetail;

    fn entry(agent_id: &str, version: &str, hash: &str) -> AgentRegistryEntry {
        AgentRegistryEntry {
            agent_id: agent_id.to_string(),
            agent_version: version.to_string(),
            agent_type: AgentType::Clinical,
            lifecycle_state: LifecycleState::Active,
            allowed_scopes: vec![],
            policy_snapshot_hash: hash.to_string(),
            last_updated_at: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    fn event(version: &str, hash: &str) -> TimelineEvent {
        TimelineEvent::new(
            "tg-1".to_string(),
            hash.to_string(),
            version.to_string(),
            "2026-03-01T09:00:00.000Z".to_string(),
            TimelineDetail::ToolGateway {
                tool_name: "chat.sendMessage".to_string(),
                outcome: ToolOutcome::Succeeded,
                error_code: None,
                duration_ms: None,
            },
        )
    }

    #[test]
    fn matches_on_version_and_hash() {
        let joiner = TimelineJoiner::new(&[entry("consent-agent", "1.0.0", "h1")]);
        let joined = joiner.join(vec![event("1.0.0", "h1"), event("1.0.0", "h2")]);

        match &joined[0].agent {
            JoinedAgent::Known(s) => assert_eq!(s.agent_id, "consent-agent"),
            other => panic!("expected a match, got {:?}", other),
        }
        assert_eq!(joined[1].agent, JoinedAgent::Unknown);
    }

    #[test]
    fn unknown_serializes_as_string() {
        let joined = TimelineJoiner::default().join(vec![event("9.9.9", "h1")]);
        let value = serde_json::to_value(&joined[0]).unwrap();
        assert_eq!(value["agent"], "unknown");
        assert_eq!(value["type"], "TOOL_GATEWAY");
    }

    #[test]
    fn collisions_resolve_to_last_agent_id() {
        // Input order must not matter.
        let joiner = TimelineJoiner::new(&[
            entry("zeta-agent", "1.0.0", "h1"),
            entry("alpha-agent", "1.0.0", "h1"),
        ]);
        match joiner.lookup("1.0.0", "h1") {
            JoinedAgent::Known(s) => assert_eq!(s.agent_id, "zeta-agent"),
            other => panic!("expected a match, got {:?}", other),
        }
    }
}
