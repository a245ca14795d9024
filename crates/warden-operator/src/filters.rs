//! Closed caller-side filter schemas.
//!
//! Every read endpoint accepts a JSON object whose keys are fixed here.
//! Unknown keys, wrong types, out-of-range limits and undecodable cursors are
//! all rejected before any data is read.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use warden_contracts::{
    agent::{AgentType, LifecycleState},
    cursor::Cursor,
    error::{WardenError, WardenResult},
    telemetry::{TimelineEventType, TimelineQuery},
};

use crate::{catalog::AgentFilters, config::OperatorConfig};

/// Filters for `getTimeline` and `getEnrichedTimeline`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimelineReadFilters {
    pub event_types: Option<Vec<TimelineEventType>>,
    pub agent_version: Option<String>,
    /// Inclusive.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive.
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

impl TimelineReadFilters {
    pub fn to_query(&self) -> WardenResult<TimelineQuery> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(invalid("'from' must not be after 'to'"));
            }
        }
        Ok(TimelineQuery {
            event_types: self.event_types.clone(),
            agent_version: self.agent_version.clone(),
            from: self.from,
            to: self.to,
        })
    }
}

/// Filters for `getAgents`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AgentReadFilters {
    pub lifecycle_state: Option<LifecycleState>,
    pub agent_type: Option<AgentType>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

impl AgentReadFilters {
    pub fn selection(&self) -> AgentFilters {
        AgentFilters {
            lifecycle_state: self.lifecycle_state,
            agent_type: self.agent_type,
        }
    }
}

/// The only caller input an execution accepts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExecuteRequest {
    pub cursor: Option<String>,
}

/// A validated page window.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub after: Option<Cursor>,
    pub limit: usize,
}

impl PageRequest {
    pub fn new(limit: Option<usize>, cursor: Option<&str>, config: &OperatorConfig) -> WardenResult<Self> {
        let limit = limit.unwrap_or(config.default_limit);
        if limit == 0 || limit > config.max_limit {
            return Err(invalid(format!(
                "limit must be between 1 and {}, got {limit}",
                config.max_limit
            )));
        }
        let after = cursor.map(Cursor::decode).transpose()?;
        Ok(Self { after, limit })
    }

    /// Rows to fetch so a further page can be detected.
    pub fn fetch(&self) -> usize {
        self.limit + 1
    }
}

/// Parse a caller filter document. `null` means "no filters".
pub fn parse<T>(what: &str, value: &Value) -> WardenResult<T>
where
    T: DeserializeOwned + Default,
{
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value.clone()).map_err(|e| invalid(format!("invalid {what}: {e}")))
}

fn invalid(reason: impl Into<String>) -> WardenError {
    WardenError::Validation {
        reason: reason.into(),
    }
}
