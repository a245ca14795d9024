//! The code-defined catalog of operator query policies and saved views.
//!
//! Policies are the only read queries operators can execute. Each one has a
//! fixed target and fixed filters; callers can page through its results but
//! cannot change what it selects. Saved views are named presentations of a
//! policy.
//!
//! Both are versioned. Every id has exactly one latest version, and every
//! `supersedes_version` must point at a registered version of the same id.
//! The catalog stores each definition once behind an `Arc`, so
//! `policy@version` and the latest alias hand back the same object.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use warden_contracts::{
    agent::{AgentType, LifecycleState},
    error::{WardenError, WardenResult},
    telemetry::{TimelineEventType, TimelineQuery},
};
use warden_policy::AgentRegistryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// The read endpoint a policy runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyTarget {
    Timeline,
    AgentRegistry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultOrdering {
    /// Timestamp ascending, event id breaking ties.
    TimestampAsc,
    /// Agent id ascending, version breaking ties.
    AgentIdAsc,
}

/// Fixed selection for a timeline policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<TimelineEventType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
}

impl TimelineFilters {
    pub fn to_query(&self) -> TimelineQuery {
        TimelineQuery {
            event_types: self.event_types.clone(),
            agent_version: self.agent_version.clone(),
            from: None,
            to: None,
        }
    }
}

/// Fixed selection for an agent registry policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<LifecycleState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<AgentType>,
}

impl AgentFilters {
    pub fn matches(&self, entry: &AgentRegistryEntry) -> bool {
        self.lifecycle_state.map_or(true, |s| entry.lifecycle_state == s)
            && self.agent_type.map_or(true, |t| entry.agent_type == t)
    }
}

/// Filters tagged by the target they apply to, so a policy cannot pair a
/// timeline target with agent filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "camelCase")]
pub enum PolicyFilters {
    Timeline(TimelineFilters),
    AgentRegistry(AgentFilters),
}

impl PolicyFilters {
    pub fn target(&self) -> PolicyTarget {
        match self {
            PolicyFilters::Timeline(_) => PolicyTarget::Timeline,
            PolicyFilters::AgentRegistry(_) => PolicyTarget::AgentRegistry,
        }
    }

    pub fn ordering(&self) -> ResultOrdering {
        match self {
            PolicyFilters::Timeline(_) => ResultOrdering::TimestampAsc,
            PolicyFilters::AgentRegistry(_) => ResultOrdering::AgentIdAsc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorQueryPolicy {
    pub policy_id: String,
    pub version: String,
    pub is_latest: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supersedes_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_at: Option<DateTime<Utc>>,
    pub risk_tier: RiskTier,
    pub description: String,
    /// Page size used when the policy runs.
    pub limit: usize,
    pub filters: PolicyFilters,
}

impl OperatorQueryPolicy {
    pub fn target(&self) -> PolicyTarget {
        self.filters.target()
    }

    pub fn ordering(&self) -> ResultOrdering {
        self.filters.ordering()
    }

    pub fn reference(&self) -> String {
        format!("{}@{}", self.policy_id, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedView {
    pub view_id: String,
    pub version: String,
    pub is_latest: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supersedes_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_at: Option<DateTime<Utc>>,
    pub title: String,
    /// Runs the latest version of this policy.
    pub policy_id: String,
}

impl SavedView {
    pub fn reference(&self) -> String {
        format!("{}@{}", self.view_id, self.version)
    }
}

/// Common shape of versioned catalog entries, used by the shared validation.
trait Versioned {
    fn id(&self) -> &str;
    fn version(&self) -> &str;
    fn is_latest(&self) -> bool;
    fn supersedes_version(&self) -> Option<&str>;
}

impl Versioned for OperatorQueryPolicy {
    fn id(&self) -> &str {
        &self.policy_id
    }
    fn version(&self) -> &str {
        &self.version
    }
    fn is_latest(&self) -> bool {
        self.is_latest
    }
    fn supersedes_version(&self) -> Option<&str> {
        self.supersedes_version.as_deref()
    }
}

impl Versioned for SavedView {
    fn id(&self) -> &str {
        &self.view_id
    }
    fn version(&self) -> &str {
        &self.version
    }
    fn is_latest(&self) -> bool {
        self.is_latest
    }
    fn supersedes_version(&self) -> Option<&str> {
        self.supersedes_version.as_deref()
    }
}

/// Versioned entries of one kind, indexed both ways.
#[derive(Debug)]
struct VersionIndex<T> {
    exact: BTreeMap<(String, String), Arc<T>>,
    latest: BTreeMap<String, Arc<T>>,
}

impl<T: Versioned> VersionIndex<T> {
    fn build(kind: &str, entries: Vec<T>) -> WardenResult<Self> {
        let mut exact: BTreeMap<(String, String), Arc<T>> = BTreeMap::new();
        let mut latest: BTreeMap<String, Arc<T>> = BTreeMap::new();

        for entry in entries {
            if entry.id().trim().is_empty() || entry.version().trim().is_empty() {
                return Err(violation(format!("{kind} id and version must not be empty")));
            }
            let key = (entry.id().to_string(), entry.version().to_string());
            let entry = Arc::new(entry);
            if entry.is_latest() && latest.insert(key.0.clone(), Arc::clone(&entry)).is_some() {
                return Err(violation(format!(
                    "{kind} '{}' has more than one latest version",
                    key.0
                )));
            }
            if exact.insert(key.clone(), entry).is_some() {
                return Err(violation(format!(
                    "{kind} '{}@{}' is registered more than once",
                    key.0, key.1
                )));
            }
        }

        for ((id, version), entry) in &exact {
            if !latest.contains_key(id) {
                return Err(violation(format!("{kind} '{id}' has no latest version")));
            }
            if let Some(prev) = entry.supersedes_version() {
                if prev == version || !exact.contains_key(&(id.clone(), prev.to_string())) {
                    return Err(violation(format!(
                        "{kind} '{id}@{version}' supersedes unknown version '{prev}'"
                    )));
                }
            }
        }

        Ok(Self { exact, latest })
    }

    fn get(&self, id: &str, version: &str) -> Option<Arc<T>> {
        self.exact.get(&(id.to_string(), version.to_string())).cloned()
    }

    fn latest(&self, id: &str) -> Option<Arc<T>> {
        self.latest.get(id).cloned()
    }
}

/// The immutable policy and view catalog.
#[derive(Debug)]
pub struct PolicyCatalog {
    policies: VersionIndex<OperatorQueryPolicy>,
    views: VersionIndex<SavedView>,
}

impl PolicyCatalog {
    pub fn new(policies: Vec<OperatorQueryPolicy>, views: Vec<SavedView>) -> WardenResult<Self> {
        for policy in &policies {
            if policy.limit == 0 {
                return Err(violation(format!(
                    "policy '{}' must have a positive page limit",
                    policy.reference()
                )));
            }
        }

        let policies = VersionIndex::build("policy", policies)?;
        let views = VersionIndex::build("view", views)?;

        for view in views.exact.values() {
            if policies.latest(&view.policy_id).is_none() {
                return Err(violation(format!(
                    "view '{}' references unknown policy '{}'",
                    view.reference(),
                    view.policy_id
                )));
            }
        }

        Ok(Self { policies, views })
    }

    pub fn policy(&self, policy_id: &str, version: &str) -> Option<Arc<OperatorQueryPolicy>> {
        self.policies.get(policy_id, version)
    }

    pub fn latest_policy(&self, policy_id: &str) -> Option<Arc<OperatorQueryPolicy>> {
        self.policies.latest(policy_id)
    }

    pub fn view(&self, view_id: &str, version: &str) -> Option<Arc<SavedView>> {
        self.views.get(view_id, version)
    }

    pub fn latest_view(&self, view_id: &str) -> Option<Arc<SavedView>> {
        self.views.latest(view_id)
    }

    /// Every policy version, ordered by id then version.
    pub fn policies(&self) -> impl Iterator<Item = &Arc<OperatorQueryPolicy>> {
        self.policies.exact.values()
    }

    /// The latest version of each policy, ordered by id.
    pub fn latest_policies(&self) -> impl Iterator<Item = &Arc<OperatorQueryPolicy>> {
        self.policies.latest.values()
    }

    pub fn views(&self) -> impl Iterator<Item = &Arc<SavedView>> {
        self.views.exact.values()
    }

    pub fn latest_views(&self) -> impl Iterator<Item = &Arc<SavedView>> {
        self.views.latest.values()
    }

    /// The catalog shipped with the control plane.
    pub fn builtin() -> WardenResult<Self> {
        let governance_types = vec![TimelineEventType::GovernanceControl];
        let escalation_types = vec![
            TimelineEventType::GovernanceControl,
            TimelineEventType::ApprovalSignal,
        ];
        // Policy retirement dates are fixed in code.
        let v1_retired = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).single();

        let policies = vec![
            OperatorQueryPolicy {
                policy_id: "governance-denials".to_string(),
                version: "1".to_string(),
                is_latest: false,
                supersedes_version: None,
                deprecated_at: v1_retired,
                risk_tier: RiskTier::High,
                description: "Governance control events".to_string(),
                limit: 50,
                filters: PolicyFilters::Timeline(TimelineFilters {
                    event_types: Some(governance_types),
                    agent_version: None,
                }),
            },
            OperatorQueryPolicy {
                policy_id: "governance-denials".to_string(),
                version: "2".to_string(),
                is_latest: true,
                supersedes_version: Some("1".to_string()),
                deprecated_at: None,
                risk_tier: RiskTier::High,
                description: "Governance control events and the approval signals they raised"
                    .to_string(),
                limit: 50,
                filters: PolicyFilters::Timeline(TimelineFilters {
                    event_types: Some(escalation_types),
                    agent_version: None,
                }),
            },
            OperatorQueryPolicy {
                policy_id: "lifecycle-changes".to_string(),
                version: "1".to_string(),
                is_latest: true,
                supersedes_version: None,
                deprecated_at: None,
                risk_tier: RiskTier::Medium,
                description: "Agent lifecycle transition attempts".to_string(),
                limit: 50,
                filters: PolicyFilters::Timeline(TimelineFilters {
                    event_types: Some(vec![TimelineEventType::LifecycleTransition]),
                    agent_version: None,
                }),
            },
            OperatorQueryPolicy {
                policy_id: "tool-activity".to_string(),
                version: "1".to_string(),
                is_latest: true,
                supersedes_version: None,
                deprecated_at: None,
                risk_tier: RiskTier::Low,
                description: "Tool gateway invocations".to_string(),
                limit: 100,
                filters: PolicyFilters::Timeline(TimelineFilters {
                    event_types: Some(vec![TimelineEventType::ToolGateway]),
                    agent_version: None,
                }),
            },
            OperatorQueryPolicy {
                policy_id: "active-agents".to_string(),
                version: "1".to_string(),
                is_latest: true,
                supersedes_version: None,
                deprecated_at: None,
                risk_tier: RiskTier::Low,
                description: "Agent versions in the active state".to_string(),
                limit: 50,
                filters: PolicyFilters::AgentRegistry(AgentFilters {
                    lifecycle_state: Some(LifecycleState::Active),
                    agent_type: None,
                }),
            },
            OperatorQueryPolicy {
                policy_id: "deprecated-agents".to_string(),
                version: "1".to_string(),
                is_latest: true,
                supersedes_version: None,
                deprecated_at: None,
                risk_tier: RiskTier::Medium,
                description: "Agent versions still running while deprecated".to_string(),
                limit: 50,
                filters: PolicyFilters::AgentRegistry(AgentFilters {
                    lifecycle_state: Some(LifecycleState::Deprecated),
                    agent_type: None,
                }),
            },
        ];

        let views = vec![
            SavedView {
                view_id: "denials-console".to_string(),
                version: "1".to_string(),
                is_latest: true,
                supersedes_version: None,
                deprecated_at: None,
                title: "Denials console".to_string(),
                policy_id: "governance-denials".to_string(),
            },
            SavedView {
                view_id: "agent-inventory".to_string(),
                version: "1".to_string(),
                is_latest: false,
                supersedes_version: None,
                deprecated_at: v1_retired,
                title: "Agent inventory".to_string(),
                policy_id: "active-agents".to_string(),
            },
            SavedView {
                view_id: "agent-inventory".to_string(),
                version: "2".to_string(),
                is_latest: true,
                supersedes_version: Some("1".to_string()),
                deprecated_at: None,
                title: "Active agent inventory".to_string(),
                policy_id: "active-agents".to_string(),
            },
            SavedView {
                view_id: "lifecycle-audit".to_string(),
                version: "1".to_string(),
                is_latest: true,
                supersedes_version: None,
                deprecated_at: None,
                title: "Lifecycle audit".to_string(),
                policy_id: "lifecycle-changes".to_string(),
            },
        ];

        Self::new(policies, views)
    }
}

fn violation(reason: impl Into<String>) -> WardenError {
    WardenError::RegistryViolation {
        reason: reason.into(),
    }
}
