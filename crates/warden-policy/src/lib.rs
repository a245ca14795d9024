//! # warden-policy
//!
//! A TOML-loaded, fail-closed agent registry and tool policy evaluator.
//!
//! ## Overview
//!
//! - [`AgentRegistry`] holds agent declarations, versions, and the tool →
//!   scope map, validated once at construction.
//! - [`PolicyEvaluator`] decides whether an agent version may call a tool.
//! - [`lifecycle`] validates lifecycle transitions and applies them through
//!   the [`LifecycleGovernor`].
//! - [`snapshot`] produces the stable policy hash.
//! - [`projection`] exposes the registry to operators in a fixed order.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::{path::Path, sync::Arc};
//! use warden_policy::{AgentRegistry, PolicyEvaluator};
//!
//! let registry = Arc::new(AgentRegistry::from_file(Path::new("registry/agents.toml"))?);
//! let decision = PolicyEvaluator::new(registry).evaluate("consent-agent", "1.0.0", "consent.getStatus");
//! ```

pub mod evaluator;
pub mod lifecycle;
pub mod projection;
pub mod registry;
pub mod snapshot;

pub use evaluator::PolicyEvaluator;
pub use lifecycle::{validate_transition, LifecycleGovernor, TransitionOutcome, TransitionRequest};
pub use projection::{AgentRegistryEntry, AgentRegistryReader};
pub use registry::{AgentRegistry, RegistryConfig, VersionConfig};
pub use snapshot::{generate_policy_snapshot, policy_hash};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use warden_contracts::{
        agent::{AgentType, LifecycleState},
        cursor::Cursor,
        error::{WardenError, WardenResult},
        governance::{ReasonCode, TransitionStatus},
        telemetry::RawEvent,
    };
    use warden_core::traits::TelemetrySink;

    use crate::{
        generate_policy_snapshot, policy_hash, validate_transition, AgentRegistry,
        AgentRegistryReader, LifecycleGovernor, PolicyEvaluator, TransitionRequest,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    const REGISTRY: &str = r#"
        policy_version = "test-1"

        [[agents]]
        agent_id = "patient-portal-agent"
        agent_type = "patient-facing"
        allowed_scopes = ["medical_advisor.read", "chat.write", "appointment.read"]

        [[agents]]
        agent_id = "consent-agent"
        agent_type = "clinical"
        allowed_scopes = ["consent.read", "consent.write"]

        [[versions]]
        agent_id = "patient-portal-agent"
        version = "1.0.0"
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
        version = "0.9.0"
        lifecycle_state = "disabled"

        [[versions]]
        agent_id = "consent-agent"
        version = "0.1.0"
        lifecycle_state = "retired"

        [[versions]]
        agent_id = "consent-agent"
        version = "read-only"
        lifecycle_state = "active"
        allowed_scopes = ["consent.read"]

        [tools]
        "chat.sendMessage" = "chat.write"
        "medical_advisor.getAdvice" = "medical_advisor.read"
        "consent.getStatus" = "consent.read"
        "consent.recordDecision" = "consent.write"
    "#;

    fn registry() -> AgentRegistry {
        AgentRegistry::from_toml_str(REGISTRY).unwrap()
    }

    fn evaluator() -> PolicyEvaluator {
        PolicyEvaluator::new(Arc::new(registry()))
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<RawEvent>>,
    }

    impl TelemetrySink for RecordingSink {
        fn record(&self, event: RawEvent) -> WardenResult<()> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    struct FailingSink;

    impl TelemetrySink for FailingSink {
        fn record(&self, _event: RawEvent) -> WardenResult<()> {
            Err(WardenError::SinkFailed {
                reason: "event store unavailable".to_string(),
            })
        }
    }

    fn statuses(sink: &RecordingSink) -> Vec<TransitionStatus> {
        sink.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| match e {
                RawEvent::LifecycleTransition(l) => l.status,
                other => panic!("unexpected telemetry {:?}", other),
            })
            .collect()
    }

    // ── 1. evaluator scenarios ────────────────────────────────────────────────

    #[test]
    fn consent_agent_cannot_send_chat() {
        let decision = evaluator().evaluate("consent-agent", "1.0.0", "chat.sendMessage");
        assert!(!decision.allowed);
        assert_eq!(decision.reason_code, Some(ReasonCode::ScopeDenied));
        assert_eq!(decision.agent_type, AgentType::Clinical);
    }

    #[test]
    fn patient_portal_may_get_advice() {
        let decision =
            evaluator().evaluate("patient-portal-agent", "1.0.0", "medical_advisor.getAdvice");
        assert!(decision.allowed);
        assert_eq!(decision.reason_code, None);
        assert_eq!(decision.warning_code, None);
        assert_eq!(decision.agent_type, AgentType::PatientFacing);
    }

    #[test]
    fn deprecated_version_is_allowed_with_warning() {
        let decision = evaluator().evaluate("consent-agent", "deprecated-v1", "consent.getStatus");
        assert!(decision.allowed);
        assert_eq!(decision.warning_code, Some(ReasonCode::DeprecatedAgent));
    }

    #[test]
    fn decision_order_is_fixed() {
        let ev = evaluator();

        let unknown_agent = ev.evaluate("ghost-agent", "1.0.0", "nonexistent.tool");
        assert_eq!(unknown_agent.reason_code, Some(ReasonCode::UnknownAgent));
        assert_eq!(unknown_agent.agent_type, AgentType::Unknown);

        // Unknown version wins over unknown tool.
        let unknown_version = ev.evaluate("consent-agent", "9.9.9", "nonexistent.tool");
        assert_eq!(unknown_version.reason_code, Some(ReasonCode::UnknownAgentVersion));

        let unknown_tool = ev.evaluate("consent-agent", "1.0.0", "nonexistent.tool");
        assert_eq!(unknown_tool.reason_code, Some(ReasonCode::UnknownTool));

        // Scope check wins over lifecycle: the disabled version lacks chat.write.
        let scope_first = ev.evaluate("consent-agent", "0.9.0", "chat.sendMessage");
        assert_eq!(scope_first.reason_code, Some(ReasonCode::ScopeDenied));
    }

    #[test]
    fn disabled_and_retired_versions_are_denied() {
        let ev = evaluator();
        for version in ["0.9.0", "0.1.0"] {
            let decision = ev.evaluate("consent-agent", version, "consent.getStatus");
            assert!(!decision.allowed, "{version} must be denied");
            assert_eq!(decision.reason_code, Some(ReasonCode::LifecycleDenied));
        }
    }

    #[test]
    fn version_scopes_narrow_declared_scopes() {
        let decision = evaluator().evaluate("consent-agent", "read-only", "consent.recordDecision");
        assert_eq!(decision.reason_code, Some(ReasonCode::ScopeDenied));
    }

    #[test]
    fn evaluate_is_pure() {
        let ev = evaluator();
        for (agent, version, tool) in [
            ("consent-agent", "1.0.0", "chat.sendMessage"),
            ("consent-agent", "deprecated-v1", "consent.recordDecision"),
            ("patient-portal-agent", "1.0.0", "medical_advisor.getAdvice"),
            ("nobody", "x", "y"),
        ] {
            assert_eq!(ev.evaluate(agent, version, tool), ev.evaluate(agent, version, tool));
        }
    }

    // ── 2. policy snapshot ────────────────────────────────────────────────────

    #[test]
    fn snapshot_hash_is_stable_and_id_is_fresh() {
        let reg = registry();
        let a = generate_policy_snapshot(&reg);
        let b = generate_policy_snapshot(&reg);

        assert_eq!(a.policy_hash, b.policy_hash);
        assert_ne!(a.snapshot_id, b.snapshot_id);
        assert_eq!(a.agent_count, 2);
        assert_eq!(a.tool_count, 4);
        assert_eq!(a.policy_version, "test-1");
    }

    #[test]
    fn snapshot_hash_ignores_declaration_order() {
        let mut config: crate::RegistryConfig = toml::from_str(REGISTRY).unwrap();
        config.agents.reverse();
        config.versions.reverse();
        let swapped = AgentRegistry::from_config(config).unwrap();

        assert_eq!(policy_hash(&registry()), policy_hash(&swapped));
    }

    #[test]
    fn snapshot_hash_tracks_lifecycle_changes() {
        let reg = registry();
        let sink = Arc::new(RecordingSink::default());
        let governor = LifecycleGovernor::new(sink);

        let outcome = governor.request_transition(
            &reg,
            &TransitionRequest {
                agent_id: "consent-agent".to_string(),
                version: "1.0.0".to_string(),
                to: LifecycleState::Deprecated,
                requested_by: None,
                request_id: None,
            },
        );
        let next = outcome.registry.unwrap();
        assert_ne!(policy_hash(&reg), policy_hash(&next));
    }

    // ── 3. lifecycle state machine ────────────────────────────────────────────

    #[test]
    fn transition_allow_list_is_exact() {
        use LifecycleState::*;
        let allowed = [
            (Experimental, Active),
            (Active, Deprecated),
            (Active, Disabled),
            (Deprecated, Retired),
            (Deprecated, Disabled),
        ];

        for from in LifecycleState::ALL {
            for to in LifecycleState::ALL {
                let decision = validate_transition(from, to);
                let expected = from == to || allowed.contains(&(from, to));
                assert_eq!(decision.allowed, expected, "{from} -> {to}");
                if !expected {
                    assert_eq!(decision.reason_code, Some(ReasonCode::LifecycleDenied));
                }
            }
        }
    }

    #[test]
    fn notable_forbidden_transitions() {
        use LifecycleState::*;
        for (from, to) in [
            (Retired, Active),
            (Retired, Deprecated),
            (Disabled, Active),
            (Active, Experimental),
            (Experimental, Deprecated),
        ] {
            let decision = validate_transition(from, to);
            assert!(!decision.allowed);
            assert_eq!(decision.reason_code, Some(ReasonCode::LifecycleDenied));
        }
    }

    #[test]
    fn governor_records_requested_then_approved() {
        let sink = Arc::new(RecordingSink::default());
        let governor = LifecycleGovernor::new(sink.clone());

        let outcome = governor.request_transition(
            &registry(),
            &TransitionRequest {
                agent_id: "consent-agent".to_string(),
                version: "deprecated-v1".to_string(),
                to: LifecycleState::Retired,
                requested_by: Some("governance-officer-7".to_string()),
                request_id: Some("req-1".to_string()),
            },
        );

        assert!(outcome.decision.allowed);
        let next = outcome.registry.unwrap();
        assert_eq!(
            next.version("consent-agent", "deprecated-v1").unwrap().lifecycle_state,
            LifecycleState::Retired
        );
        assert_eq!(
            statuses(&sink),
            vec![TransitionStatus::Requested, TransitionStatus::Approved]
        );
    }

    #[test]
    fn governor_records_rejection() {
        let sink = Arc::new(RecordingSink::default());
        let governor = LifecycleGovernor::new(sink.clone());

        let outcome = governor.request_transition(
            &registry(),
            &TransitionRequest {
                agent_id: "consent-agent".to_string(),
                version: "0.1.0".to_string(),
                to: LifecycleState::Active,
                requested_by: None,
                request_id: None,
            },
        );

        assert!(!outcome.decision.allowed);
        assert!(outcome.registry.is_none());
        assert_eq!(
            statuses(&sink),
            vec![TransitionStatus::Requested, TransitionStatus::Rejected]
        );
    }

    #[test]
    fn governor_decision_survives_failing_sink() {
        let governor = LifecycleGovernor::new(Arc::new(FailingSink));
        let outcome = governor.request_transition(
            &registry(),
            &TransitionRequest {
                agent_id: "consent-agent".to_string(),
                version: "1.0.0".to_string(),
                to: LifecycleState::Deprecated,
                requested_by: None,
                request_id: None,
            },
        );
        assert!(outcome.decision.allowed);
        assert!(outcome.registry.is_some());
    }

    #[test]
    fn governor_unknown_version_is_rejected_and_recorded() {
        let sink = Arc::new(RecordingSink::default());
        let governor = LifecycleGovernor::new(sink.clone());
        let outcome = governor.request_transition(
            &registry(),
            &TransitionRequest {
                agent_id: "consent-agent".to_string(),
                version: "7.7.7".to_string(),
                to: LifecycleState::Active,
                requested_by: None,
                request_id: None,
            },
        );
        assert_eq!(outcome.decision.reason_code, Some(ReasonCode::UnknownAgentVersion));
        assert!(outcome.registry.is_none());
        assert_eq!(
            statuses(&sink),
            vec![TransitionStatus::Requested, TransitionStatus::Rejected]
        );
        match sink.events.lock().unwrap().last() {
            Some(RawEvent::LifecycleTransition(e)) => {
                assert_eq!(e.from_state, None);
                assert_eq!(e.reason_code, Some(ReasonCode::UnknownAgentVersion));
                assert_eq!(e.policy_snapshot_hash, policy_hash(&registry()));
            }
            other => panic!("expected a lifecycle event, got {:?}", other),
        };
    }

    #[test]
    fn governor_unknown_agent_is_recorded_as_unknown_agent() {
        let sink = Arc::new(RecordingSink::default());
        let governor = LifecycleGovernor::new(sink.clone());
        let outcome = governor.request_transition(
            &registry(),
            &TransitionRequest {
                agent_id: "ghost-agent".to_string(),
                version: "1.0.0".to_string(),
                to: LifecycleState::Retired,
                requested_by: None,
                request_id: None,
            },
        );
        assert_eq!(outcome.decision.reason_code, Some(ReasonCode::UnknownAgent));
        assert_eq!(sink.events.lock().unwrap().len(), 2);
    }

    // ── 4. registry validation ────────────────────────────────────────────────

    #[test]
    fn registry_rejects_undeclared_agent_version() {
        let toml = r#"
            policy_version = "x"

            [[versions]]
            agent_id = "ghost"
            version = "1"
            lifecycle_state = "active"
        "#;
        match AgentRegistry::from_toml_str(toml) {
            Err(WardenError::RegistryViolation { reason }) => assert!(reason.contains("ghost")),
            other => panic!("expected RegistryViolation, got {:?}", other),
        }
    }

    #[test]
    fn registry_rejects_scope_escalation() {
        let toml = r#"
            policy_version = "x"

            [[agents]]
            agent_id = "a"
            agent_type = "platform"
            allowed_scopes = ["chat.read"]

            [[versions]]
            agent_id = "a"
            version = "1"
            lifecycle_state = "active"
            allowed_scopes = ["chat.read", "chat.write"]
        "#;
        match AgentRegistry::from_toml_str(toml) {
            Err(WardenError::RegistryViolation { reason }) => assert!(reason.contains("chat.write")),
            other => panic!("expected RegistryViolation, got {:?}", other),
        }
    }

    #[test]
    fn registry_rejects_duplicate_version() {
        let toml = r#"
            policy_version = "x"

            [[agents]]
            agent_id = "a"
            agent_type = "platform"

            [[versions]]
            agent_id = "a"
            version = "1"
            lifecycle_state = "active"

            [[versions]]
            agent_id = "a"
            version = "1"
            lifecycle_state = "deprecated"
        "#;
        assert!(matches!(
            AgentRegistry::from_toml_str(toml),
            Err(WardenError::RegistryViolation { .. })
        ));
    }

    #[test]
    fn registry_rejects_unknown_keys_and_bad_toml() {
        let unknown_key = r#"
            policy_version = "x"
            surprise = true
        "#;
        assert!(matches!(
            AgentRegistry::from_toml_str(unknown_key),
            Err(WardenError::ConfigError { .. })
        ));

        match AgentRegistry::from_toml_str("this is not toml ][") {
            Err(WardenError::ConfigError { reason }) => {
                assert!(reason.contains("failed to parse registry TOML"))
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    // ── 5. registry projection ────────────────────────────────────────────────

    #[test]
    fn projection_order_is_agent_then_version() {
        let reader = AgentRegistryReader::new(&registry());
        let keys: Vec<(String, String)> = reader
            .entries()
            .iter()
            .map(|e| (e.agent_id.clone(), e.agent_version.clone()))
            .collect();

        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.first().unwrap().0, "consent-agent");
        assert_eq!(keys.last().unwrap().0, "patient-portal-agent");
    }

    #[test]
    fn projection_entries_share_one_snapshot() {
        let reader = AgentRegistryReader::new(&registry());
        let hash = &reader.snapshot().policy_hash;
        for entry in reader.entries() {
            assert_eq!(&entry.policy_snapshot_hash, hash);
            assert_eq!(entry.last_updated_at, reader.snapshot().generated_at);
            let mut scopes = entry.allowed_scopes.clone();
            scopes.sort();
            assert_eq!(entry.allowed_scopes, scopes);
        }
    }

    #[test]
    fn projection_page_resumes_after_cursor() {
        let reader = AgentRegistryReader::new(&registry());
        let first = reader.page(None, |_| true, 2);
        assert_eq!(first.len(), 2);

        let cursor: Cursor = first.last().unwrap().cursor();
        let rest = reader.page(Some(&cursor), |_| true, 100);
        assert_eq!(first.len() + rest.len(), reader.entries().len());
        assert!(rest.iter().all(|e| !first.contains(e)));

        let active_only = reader.page(None, |e| e.lifecycle_state == LifecycleState::Active, 100);
        assert!(active_only
            .iter()
            .all(|e| e.lifecycle_state == LifecycleState::Active));
    }
}
