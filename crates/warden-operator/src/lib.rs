//! # warden-operator
//!
//! The read-only operator surface of the WARDEN control plane.
//!
//! - [`PolicyCatalog`]: immutable, versioned query policies and saved views.
//! - [`VersionResolver`]: resolution of an id and optional version, with a
//!   metadata-only memo cache of hits.
//! - [`OperatorApi`]: strict filters, cursor pagination, policy and view
//!   execution, decision hooks on v2 executions, one audit record per call.

pub mod api;
pub mod catalog;
pub mod config;
pub mod dto;
pub mod filters;
pub mod hook;
pub mod resolver;

pub use api::OperatorApi;
pub use catalog::{
    AgentFilters, OperatorQueryPolicy, PolicyCatalog, PolicyFilters, PolicyTarget,
    ResultOrdering, RiskTier, SavedView, TimelineFilters,
};
pub use config::OperatorConfig;
pub use dto::{
    ApiVersion, CatalogListDto, ExecutionKind, ExecutionOutcome, ExecutionResultDto, PageDto,
    PageInfo, ResultSummary,
};
pub use hook::{DecisionContext, DecisionHook, DefaultDecisionHook, HookDecision};
pub use resolver::VersionResolver;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{Arc, Mutex},
    };

    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::{json, Value};

    use warden_contracts::{
        agent::LifecycleState,
        audit::{AuditAction, AuditOutcome, AuditRecord},
        error::{WardenError, WardenResult},
        governance::{GovernanceOutcomeKind, ReasonCode, Severity, TransitionStatus},
        telemetry::{
            RawApprovalSignalEvent, RawEvent, RawGovernanceEvent, RawLifecycleEvent,
            RawToolGatewayEvent, TimelineEventType, TimelineQuery, ToolOutcome,
        },
    };
    use warden_core::{
        traits::{AuditEmitter, MetricsSink, TimelineReader},
        SafeMetrics,
    };
    use warden_policy::{policy_hash, AgentRegistry};
    use warden_timeline::{
        InMemoryTimelineReader, JoinedAgent, TimelineAggregator, TimelineSource, ToolAllowlist,
    };

    use crate::{
        hook::{ReviewAction, ReviewSeverity},
        *,
    };

    const REGISTRY: &str = r#"
        policy_version = "operator-test"

        [[agents]]
        agent_id = "patient-portal-agent"
        agent_type = "patient-facing"
        allowed_scopes = ["chat.write"]

        [[agents]]
        agent_id = "consent-agent"
        agent_type = "clinical"
        allowed_scopes = ["consent.read", "consent.write"]

        [[versions]]
        agent_id = "patient-portal-agent"
        version = "3.1.0"
        lifecycle_state = "active"

        [[versions]]
        agent_id = "consent-agent"
        version = "1.0.0"
        lifecycle_state = "active"

        [[versions]]
        agent_id = "consent-agent"
        version = "deprecated-v1"
        lifecycle_state = "deprecated"

        [[versions]]
        agent_id = "consent-agent"
        version = "read-only"
        lifecycle_state = "active"
        allowed_scopes = ["consent.read"]

        [tools]
        "chat.sendMessage" = "chat.write"
        "consent.getStatus" = "consent.read"
        "consent.recordDecision" = "consent.write"
    "#;

    // ── Mock collaborators ────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingAudit {
        records: Mutex<Vec<AuditRecord>>,
    }

    impl RecordingAudit {
        fn records(&self) -> Vec<AuditRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl AuditEmitter for RecordingAudit {
        fn emit(&self, record: &AuditRecord) -> WardenResult<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct FailingAudit;

    impl AuditEmitter for FailingAudit {
        fn emit(&self, _record: &AuditRecord) -> WardenResult<()> {
            Err(WardenError::AuditWriteFailed {
                reason: "audit store offline".to_string(),
            })
        }
    }

    struct FailingReader;

    impl TimelineReader for FailingReader {
        fn query(&self, _query: &TimelineQuery) -> WardenResult<Vec<RawEvent>> {
            Err(WardenError::ReaderFailed {
                reason: "event store timeout".to_string(),
            })
        }

        fn get_event(&self, _id: &str) -> WardenResult<Option<RawEvent>> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct RecordingMetrics {
        timings: Mutex<Vec<String>>,
    }

    impl MetricsSink for RecordingMetrics {
        fn increment(&self, _name: &str, _value: u64, _labels: &[(&str, &str)]) -> WardenResult<()> {
            Ok(())
        }

        fn timing(&self, name: &str, _millis: u64, _labels: &[(&str, &str)]) -> WardenResult<()> {
            self.timings.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    // ── Fixtures ──────────────────────────────────────────────────────────────

    fn registry() -> AgentRegistry {
        AgentRegistry::from_toml_str(REGISTRY).unwrap()
    }

    fn at(minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, second).unwrap()
    }

    fn denial(hash: &str, ts: DateTime<Utc>) -> RawEvent {
        RawEvent::GovernanceControl(RawGovernanceEvent {
            request_id: Some("req-secret".to_string()),
            tenant_id: Some("tenant-1".to_string()),
            actor_id: Some("actor-1".to_string()),
            agent_id: "consent-agent".to_string(),
            agent_version: "1.0.0".to_string(),
            policy_snapshot_hash: hash.to_string(),
            tool_name: "consent.recordDecision".to_string(),
            decision: GovernanceOutcomeKind::Denied,
            reason_code: ReasonCode::ScopeDenied,
            payload: json!({ "note": "SECRET" }),
            timestamp: ts,
        })
    }

    fn escalation(hash: &str, ts: DateTime<Utc>) -> RawEvent {
        RawEvent::ApprovalSignal(RawApprovalSignalEvent {
            request_id: None,
            tenant_id: None,
            actor_id: None,
            agent_id: "consent-agent".to_string(),
            agent_version: "1.0.0".to_string(),
            policy_snapshot_hash: hash.to_string(),
            tool_name: "consent.recordDecision".to_string(),
            decision: GovernanceOutcomeKind::Denied,
            reason_code: ReasonCode::ScopeDenied,
            severity: Severity::High,
            escalation_level: 3,
            timestamp: ts,
        })
    }

    fn tool_call(request_id: &str, hash: &str, ts: DateTime<Utc>) -> RawEvent {
        RawEvent::ToolGateway(RawToolGatewayEvent {
            request_id: request_id.to_string(),
            tenant_id: "tenant-1".to_string(),
            actor_id: "actor-1".to_string(),
            actor_type: "patient".to_string(),
            idempotency_key: None,
            agent_id: "patient-portal-agent".to_string(),
            agent_version: "3.1.0".to_string(),
            policy_snapshot_hash: hash.to_string(),
            tool_name: "chat.sendMessage".to_string(),
            outcome: ToolOutcome::Succeeded,
            error_code: None,
            duration_ms: Some(12),
            payload: json!({}),
            timestamp: ts,
        })
    }

    fn lifecycle(hash: &str, ts: DateTime<Utc>) -> RawEvent {
        RawEvent::LifecycleTransition(RawLifecycleEvent {
            request_id: None,
            actor_id: None,
            agent_id: "consent-agent".to_string(),
            agent_version: "deprecated-v1".to_string(),
            policy_snapshot_hash: hash.to_string(),
            from_state: Some(LifecycleState::Active),
            to_state: LifecycleState::Deprecated,
            status: TransitionStatus::Approved,
            reason_code: None,
            timestamp: ts,
        })
    }

    /// 12 denials, 2 escalations, 5 tool calls, 2 lifecycle events.
    fn events(hash: &str) -> Vec<RawEvent> {
        let mut events = Vec::new();
        for i in 0..12 {
            events.push(denial(hash, at(i, 0)));
        }
        events.push(escalation(hash, at(3, 10)));
        events.push(escalation(hash, at(7, 10)));
        for i in 0..5 {
            events.push(tool_call(&format!("req-{i}"), hash, at(i, 20)));
        }
        events.push(lifecycle(hash, at(20, 0)));
        events.push(lifecycle(hash, at(21, 0)));
        events
    }

    struct Harness {
        api: OperatorApi,
        audit: Arc<RecordingAudit>,
    }

    fn harness_with(catalog: PolicyCatalog, reader: Arc<dyn TimelineReader>) -> Harness {
        let registry = registry();
        let source = TimelineSource::new(
            reader,
            TimelineAggregator::new(ToolAllowlist::from_registry(&registry)),
        );
        let audit = Arc::new(RecordingAudit::default());
        let api = OperatorApi::new(Arc::new(catalog), source, &registry, audit.clone())
            .with_decision_hook(Arc::new(DefaultDecisionHook));
        Harness { api, audit }
    }

    fn harness() -> Harness {
        let hash = policy_hash(&registry());
        harness_with(
            PolicyCatalog::builtin().unwrap(),
            Arc::new(InMemoryTimelineReader::with_events(events(&hash))),
        )
    }

    fn small_page_catalog() -> PolicyCatalog {
        PolicyCatalog::new(
            vec![OperatorQueryPolicy {
                policy_id: "recent-denials".to_string(),
                version: "1".to_string(),
                is_latest: true,
                supersedes_version: None,
                deprecated_at: None,
                risk_tier: RiskTier::Low,
                description: "Denials, five at a time".to_string(),
                limit: 5,
                filters: PolicyFilters::Timeline(TimelineFilters {
                    event_types: Some(vec![TimelineEventType::GovernanceControl]),
                    agent_version: None,
                }),
            }],
            vec![],
        )
        .unwrap()
    }

    // ── Read endpoints ────────────────────────────────────────────────────────

    #[test]
    fn timeline_cursor_walk_is_complete_and_deterministic() {
        let h = harness();
        let walk = || {
            let mut seen = Vec::new();
            let mut filters = json!({ "limit": 4 });
            loop {
                let page = h.api.get_timeline(&filters).unwrap();
                assert!(page.count <= 4);
                seen.extend(page.items.iter().map(|e| e.event_id().to_string()));
                match page.next_cursor {
                    Some(cursor) => {
                        assert!(page.has_more);
                        filters = json!({ "limit": 4, "cursor": cursor });
                    }
                    None => {
                        assert!(!page.has_more);
                        break;
                    }
                }
            }
            seen
        };

        let first = walk();
        assert_eq!(first.len(), 21);
        assert_eq!(first.iter().collect::<HashSet<_>>().len(), 21, "no duplicates");
        assert_eq!(first, walk());
    }

    #[test]
    fn timeline_pages_never_leak_identifiers() {
        let h = harness();
        let page = h.api.get_timeline(&Value::Null).unwrap();
        let text = serde_json::to_string(&page).unwrap();
        for needle in ["tenant-1", "actor-1", "req-secret", "SECRET", "tenantId", "requestId"] {
            assert!(!text.contains(needle), "page leaked {needle}");
        }
    }

    #[test]
    fn agents_are_filtered_and_ordered() {
        let h = harness();
        let page = h.api.get_agents(&json!({ "lifecycleState": "active" })).unwrap();
        let ids: Vec<(&str, &str)> = page
            .items
            .iter()
            .map(|e| (e.agent_id.as_str(), e.agent_version.as_str()))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("consent-agent", "1.0.0"),
                ("consent-agent", "read-only"),
                ("patient-portal-agent", "3.1.0"),
            ]
        );
        assert!(!page.has_more);

        let first = h.api.get_agents(&json!({ "limit": 1 })).unwrap();
        assert!(first.has_more);
        let rest = h
            .api
            .get_agents(&json!({ "cursor": first.next_cursor.unwrap() }))
            .unwrap();
        assert_eq!(rest.count, 3);
        assert_eq!(rest.items[0].agent_version, "deprecated-v1");
    }

    #[test]
    fn enriched_timeline_joins_on_version_and_snapshot() {
        let hash = policy_hash(&registry());
        let mut raw = events(&hash);
        raw.push(denial("stale-snapshot", at(30, 0)));
        let h = harness_with(
            PolicyCatalog::builtin().unwrap(),
            Arc::new(InMemoryTimelineReader::with_events(raw)),
        );

        let page = h.api.get_enriched_timeline(&json!({ "limit": 200 })).unwrap();
        assert_eq!(page.count, 22);
        let last = page.items.last().unwrap();
        assert_eq!(last.agent, JoinedAgent::Unknown);
        match &page.items[0].agent {
            JoinedAgent::Known(summary) => assert_eq!(summary.agent_id, "consent-agent"),
            other => panic!("expected a registry match, got {:?}", other),
        }
        assert!(serde_json::to_string(last).unwrap().contains("\"agent\":\"unknown\""));
    }

    #[test]
    fn strict_filters_reject_and_audit() {
        let h = harness();
        for bad in [
            json!({ "tenantId": "tenant-1" }),
            json!({ "limit": 0 }),
            json!({ "limit": 201 }),
            json!({ "cursor": "not a cursor" }),
            json!({ "eventTypes": ["NOT_A_TYPE"] }),
        ] {
            assert!(h.api.get_timeline(&bad).is_err(), "accepted {bad}");
        }
        let records = h.audit.records();
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.action == AuditAction::TimelineRead
            && r.outcome == AuditOutcome::Rejected
            && r.reason_code == Some(ReasonCode::ValidationFailed)));
    }

    // ── Executions ────────────────────────────────────────────────────────────

    #[test]
    fn view_execution_matches_its_policy() {
        let h = harness();
        let by_policy = h.api.execute_policy("governance-denials", None, &Value::Null);
        let by_view = h.api.execute_view("denials-console", None, &Value::Null);

        assert_eq!(by_policy.outcome, ExecutionOutcome::Success);
        assert_eq!(by_view.outcome, ExecutionOutcome::Success);
        // Latest governance-denials counts denials and escalations.
        assert_eq!(by_policy.result_summary.count, 14);
        assert_eq!(by_view.result_summary, by_policy.result_summary);
        assert_eq!(by_view.page_info, by_policy.page_info);
        assert_eq!(by_view.kind, ExecutionKind::View);
        assert_eq!(by_view.decision, None);
    }

    #[test]
    fn v2_reports_the_version_that_ran() {
        let h = harness();
        let pinned = h.api.execute_policy_v2("governance-denials", Some("1"), &Value::Null);
        assert_eq!(pinned.version, ApiVersion::V2);
        assert_eq!(pinned.policy_version.as_deref(), Some("1"));
        assert_eq!(pinned.result_summary.count, 12);

        let latest = h.api.execute_policy_v2("governance-denials", None, &Value::Null);
        assert_eq!(latest.policy_version.as_deref(), Some("2"));

        let view = h.api.execute_view_v2("agent-inventory", Some("1"), &Value::Null);
        assert_eq!(view.policy_version.as_deref(), Some("1"));
        assert_eq!(view.result_summary.count, 3);

        let v1 = h.api.execute_policy("governance-denials", Some("1"), &Value::Null);
        assert_eq!(v1.policy_version, None);
        assert_eq!(v1.result_summary.count, 12);
    }

    #[test]
    fn unknown_references_do_not_grow_the_resolver() {
        let h = harness();
        h.api.execute_policy("governance-denials", None, &Value::Null);
        let warm = h.api.resolver().cached();
        for i in 0..500 {
            let result = h.api.execute_policy(&format!("bogus-{i}"), None, &Value::Null);
            assert_eq!(result.reason_code, Some(ReasonCode::UnknownPolicyId));
            h.api.execute_view_v2(&format!("bogus-{i}"), Some("1"), &Value::Null);
        }
        h.api.execute_policy("governance-denials", Some("99"), &Value::Null);
        assert_eq!(h.api.resolver().cached(), warm);
    }

    #[test]
    fn unknown_ids_are_reported_with_compliance_review() {
        let h = harness();
        let policy = h.api.execute_policy("no-such-policy", None, &Value::Null);
        assert_eq!(policy.outcome, ExecutionOutcome::Error);
        assert_eq!(policy.reason_code, Some(ReasonCode::UnknownPolicyId));
        assert_eq!(policy.page_info.limit, 0);

        // The decision hook only advises v2 callers.
        assert_eq!(policy.decision, None);
        assert!(serde_json::to_value(&policy).unwrap().get("decision").map_or(true, Value::is_null));

        let view = h.api.execute_view_v2("no-such-view", None, &Value::Null);
        assert_eq!(view.reason_code, Some(ReasonCode::UnknownViewId));
        assert_eq!(
            view.decision,
            Some(HookDecision {
                kind: ReviewAction::ComplianceReview,
                severity: ReviewSeverity::Warning,
                reason_code: Some(ReasonCode::UnknownViewId),
            })
        );
        let wire = serde_json::to_value(&view).unwrap();
        assert_eq!(wire["decision"]["kind"], "COMPLIANCE_REVIEW");
        assert_eq!(wire["decision"]["reasonCode"], "UNKNOWN_VIEW_ID");

        let records = h.audit.records();
        assert_eq!(records[0].action, AuditAction::PolicyExecute);
        assert_eq!(records[1].action, AuditAction::ViewExecute);
        assert!(records.iter().all(|r| r.outcome == AuditOutcome::Rejected));
    }

    #[test]
    fn caller_cannot_override_policy_filters() {
        let h = harness();
        let result = h
            .api
            .execute_policy_v2(
                "governance-denials",
                None,
                &json!({ "eventTypes": ["TOOL_GATEWAY"] }),
            );
        assert_eq!(result.outcome, ExecutionOutcome::Error);
        assert_eq!(result.reason_code, Some(ReasonCode::ValidationFailed));
        // High-risk failure escalates to security review.
        assert_eq!(
            result.decision,
            Some(HookDecision {
                kind: ReviewAction::SecurityReview,
                severity: ReviewSeverity::Critical,
                reason_code: Some(ReasonCode::ValidationFailed),
            })
        );
    }

    #[test]
    fn execution_pages_with_the_policy_limit() {
        let hash = policy_hash(&registry());
        let h = harness_with(
            small_page_catalog(),
            Arc::new(InMemoryTimelineReader::with_events(events(&hash))),
        );

        let first = h.api.execute_policy("recent-denials", None, &Value::Null);
        assert_eq!(
            first.page_info,
            PageInfo {
                has_next_page: true,
                count: 5,
                limit: 5,
            }
        );

        // Executions return no cursor; take one from the read endpoint.
        let page = h
            .api
            .get_timeline(&json!({ "eventTypes": ["GOVERNANCE_CONTROL"], "limit": 10 }))
            .unwrap();
        let cursor = page.next_cursor.unwrap();
        let tail = h.api.execute_policy("recent-denials", None, &json!({ "cursor": cursor }));
        assert_eq!(tail.page_info.count, 2);
        assert!(!tail.page_info.has_next_page);
    }

    #[test]
    fn reader_failure_is_internal_error() {
        let h = harness_with(PolicyCatalog::builtin().unwrap(), Arc::new(FailingReader));
        let result = h.api.execute_policy_v2("tool-activity", None, &Value::Null);
        assert_eq!(result.reason_code, Some(ReasonCode::InternalError));
        // Low risk and not a misconfiguration: no decision.
        assert_eq!(result.decision, None);

        match h.api.get_timeline(&Value::Null) {
            Err(WardenError::ReaderFailed { .. }) => {}
            other => panic!("expected ReaderFailed, got {:?}", other),
        }
        assert_eq!(h.audit.records()[1].reason_code, Some(ReasonCode::InternalError));

        // Registry-backed policies do not touch the timeline reader.
        let agents = h.api.execute_policy("active-agents", None, &Value::Null);
        assert_eq!(agents.outcome, ExecutionOutcome::Success);
    }

    // ── Audit and metrics ─────────────────────────────────────────────────────

    #[test]
    fn every_call_audits_exactly_once() {
        let h = harness();
        h.api.get_timeline(&Value::Null).unwrap();
        h.api.get_agents(&Value::Null).unwrap();
        h.api.get_enriched_timeline(&Value::Null).unwrap();
        h.api.execute_policy("tool-activity", None, &Value::Null);
        h.api.execute_view("lifecycle-audit", None, &Value::Null);
        h.api.execute_policy_v2("nope", None, &Value::Null);
        h.api.execute_view_v2("agent-inventory", None, &json!({ "cursor": "%%" }));

        let actions: Vec<AuditAction> = h.audit.records().iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::TimelineRead,
                AuditAction::AgentsRead,
                AuditAction::EnrichedTimelineRead,
                AuditAction::PolicyExecute,
                AuditAction::ViewExecute,
                AuditAction::PolicyExecute,
                AuditAction::ViewExecute,
            ]
        );
    }

    #[test]
    fn audit_failure_is_contained() {
        let hash = policy_hash(&registry());
        let registry = registry();
        let source = TimelineSource::new(
            Arc::new(InMemoryTimelineReader::with_events(events(&hash))),
            TimelineAggregator::new(ToolAllowlist::from_registry(&registry)),
        );
        let api = OperatorApi::new(
            Arc::new(PolicyCatalog::builtin().unwrap()),
            source,
            &registry,
            Arc::new(FailingAudit),
        );
        assert_eq!(api.get_timeline(&Value::Null).unwrap().count, 21);
        assert_eq!(
            api.execute_policy("lifecycle-changes", None, &Value::Null).outcome,
            ExecutionOutcome::Success
        );
    }

    #[test]
    fn timings_are_recorded() {
        let metrics = Arc::new(RecordingMetrics::default());
        let h = harness();
        let api = h.api.with_metrics(SafeMetrics::new(metrics.clone()));
        api.get_agents(&Value::Null).unwrap();
        api.execute_policy("active-agents", None, &Value::Null);
        assert_eq!(
            *metrics.timings.lock().unwrap(),
            vec!["operator_read_ms".to_string(), "operator_execution_ms".to_string()]
        );
    }

    // ── Catalog listings ──────────────────────────────────────────────────────

    #[test]
    fn listings_by_api_version() {
        let h = harness();
        assert_eq!(h.api.list_policies().count, 5);
        assert_eq!(h.api.list_policies_v2().count, 6);
        assert_eq!(h.api.list_views().count, 3);
        assert_eq!(h.api.list_views_v2().count, 4);

        let v1 = serde_json::to_value(h.api.list_policies()).unwrap();
        assert_eq!(v1["version"], "v1");
        assert!(v1["items"][0].get("isLatest").is_none());
        let v2 = serde_json::to_value(h.api.list_policies_v2()).unwrap();
        assert!(v2["items"][0].get("isLatest").is_some());
    }
}
