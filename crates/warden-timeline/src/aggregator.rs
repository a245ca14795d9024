//! Raw telemetry → sanitized timeline events.
//!
//! This is the only code that reads raw events. Each mapping function copies
//! the allow-listed fields and nothing else.
//!
//! Event ids:
//! - tool gateway: `tg-` plus a digest of the source request id, so the id is
//!   stable across reads but the request id itself never leaves the store.
//! - everything else: `<prefix>-<epoch millis>-<16 hex>`, the hex being a
//!   digest of the sanitized content plus the source identifiers (request,
//!   tenant, actor, agent). The identifiers only feed the digest.
//!
//! Events that are still identical after that (same content, same source)
//! are told apart in [`TimelineAggregator::aggregate`] by their occurrence
//! order in the store, so every event in a read has a distinct id.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::debug;

use warden_contracts::{
    canonical::{hash_canonical_json, sha256_hex},
    telemetry::{
        RawApprovalSignalEvent, RawEvent, RawGovernanceEvent, RawLifecycleEvent,
        RawToolGatewayEvent,
    },
};

use crate::{
    allowlist::ToolAllowlist,
    event::{TimelineDetail, TimelineEvent},
};

const ID_HASH_LEN: usize = 16;

/// RFC 3339 UTC with millisecond precision and a `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone)]
pub struct TimelineAggregator {
    allowlist: ToolAllowlist,
}

impl TimelineAggregator {
    pub fn new(allowlist: ToolAllowlist) -> Self {
        Self { allowlist }
    }

    pub fn allowlist(&self) -> &ToolAllowlist {
        &self.allowlist
    }

    pub fn map_tool_gateway(&self, raw: &RawToolGatewayEvent) -> TimelineEvent {
        let digest = sha256_hex(raw.request_id.as_bytes());
        TimelineEvent::new(
            format!("tg-{}", &digest[..32]),
            raw.policy_snapshot_hash.clone(),
            raw.agent_version.clone(),
            format_timestamp(raw.timestamp),
            TimelineDetail::ToolGateway {
                tool_name: self.allowlist.sanitize(&raw.tool_name),
                outcome: raw.outcome,
                error_code: raw.error_code,
                duration_ms: raw.duration_ms,
            },
        )
    }

    pub fn map_governance(&self, raw: &RawGovernanceEvent) -> TimelineEvent {
        content_addressed(
            "gc",
            json!({
                "requestId": raw.request_id,
                "tenantId": raw.tenant_id,
                "actorId": raw.actor_id,
                "agentId": raw.agent_id,
            }),
            raw.policy_snapshot_hash.clone(),
            raw.agent_version.clone(),
            raw.timestamp,
            TimelineDetail::GovernanceControl {
                tool_name: self.allowlist.sanitize(&raw.tool_name),
                decision: raw.decision,
                reason_code: raw.reason_code,
            },
        )
    }

    pub fn map_approval_signal(&self, raw: &RawApprovalSignalEvent) -> TimelineEvent {
        content_addressed(
            "as",
            json!({
                "requestId": raw.request_id,
                "tenantId": raw.tenant_id,
                "actorId": raw.actor_id,
                "agentId": raw.agent_id,
            }),
            raw.policy_snapshot_hash.clone(),
            raw.agent_version.clone(),
            raw.timestamp,
            TimelineDetail::ApprovalSignal {
                tool_name: self.allowlist.sanitize(&raw.tool_name),
                decision: raw.decision,
                reason_code: raw.reason_code,
                severity: raw.severity,
                escalation_level: raw.escalation_level,
            },
        )
    }

    pub fn map_lifecycle(&self, raw: &RawLifecycleEvent) -> TimelineEvent {
        content_addressed(
            "lt",
            json!({
                "requestId": raw.request_id,
                "actorId": raw.actor_id,
                "agentId": raw.agent_id,
            }),
            raw.policy_snapshot_hash.clone(),
            raw.agent_version.clone(),
            raw.timestamp,
            TimelineDetail::LifecycleTransition {
                from_state: raw.from_state,
                to_state: raw.to_state,
                status: raw.status,
                reason_code: raw.reason_code,
            },
        )
    }

    pub fn map(&self, raw: &RawEvent) -> TimelineEvent {
        match raw {
            RawEvent::ToolGateway(e) => self.map_tool_gateway(e),
            RawEvent::GovernanceControl(e) => self.map_governance(e),
            RawEvent::ApprovalSignal(e) => self.map_approval_signal(e),
            RawEvent::LifecycleTransition(e) => self.map_lifecycle(e),
        }
    }

    /// Map every raw event and return them in chronological order.
    ///
    /// The n-th repeat of an id (in store order) gets a new digest over the
    /// id and `n`. Identical events pass or fail a query together, so the
    /// renumbering is the same for every filtered read.
    pub fn aggregate(&self, raw: &[RawEvent]) -> Vec<TimelineEvent> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut events: Vec<TimelineEvent> = raw
            .iter()
            .map(|e| {
                let mut event = self.map(e);
                let repeat = seen.entry(event.event_id().to_string()).or_insert(0);
                if *repeat > 0 {
                    let id = disambiguate(event.event_id(), *repeat);
                    event.set_event_id(id);
                }
                *repeat += 1;
                event
            })
            .collect();
        sort_chronologically(&mut events);
        debug!(count = events.len(), "timeline aggregated");
        events
    }
}

/// Ascending by timestamp string, ties broken by event id.
pub fn sort_chronologically(events: &mut [TimelineEvent]) {
    events.sort_by(|a, b| {
        a.timestamp()
            .cmp(b.timestamp())
            .then_with(|| a.event_id().cmp(b.event_id()))
    });
}

fn content_addressed(
    prefix: &str,
    source: Value,
    policy_snapshot_hash: String,
    agent_version: String,
    ts: DateTime<Utc>,
    detail: TimelineDetail,
) -> TimelineEvent {
    let timestamp = format_timestamp(ts);
    let digest = hash_canonical_json(&json!({
        "policySnapshotHash": policy_snapshot_hash,
        "agentVersion": agent_version,
        "timestamp": timestamp,
        "detail": detail,
        "source": source,
    }));
    TimelineEvent::new(
        format!("{prefix}-{}-{}", ts.timestamp_millis(), &digest[..ID_HASH_LEN]),
        policy_snapshot_hash,
        agent_version,
        timestamp,
        detail,
    )
}

/// Keep the `<prefix>-<millis>-` head and replace the digest.
fn disambiguate(event_id: &str, repeat: usize) -> String {
    let digest = hash_canonical_json(&json!({ "eventId": event_id, "repeat": repeat }));
    match event_id.rsplit_once('-') {
        Some((head, _)) => format!("{head}-{}", &digest[..ID_HASH_LEN]),
        None => format!("{event_id}-{}", &digest[..ID_HASH_LEN]),
    }
}
