//! # warden-contracts
//!
//! Shared types, reason codes, and telemetry shapes for the WARDEN
//! governance control plane.
//!
//! All crates in the workspace import from here. Apart from the cursor codec
//! and the canonical hashing helpers, no logic lives in this crate.

pub mod agent;
pub mod audit;
pub mod canonical;
pub mod cursor;
pub mod error;
pub mod governance;
pub mod mutation;
pub mod snapshot;
pub mod telemetry;

#[cfg(test)]
mod tests {
    use super::*;
    use agent::{AgentType, LifecycleState};
    use cursor::Cursor;
    use error::WardenError;
    use governance::{GovernanceDecision, GovernanceOutcomeKind, ReasonCode};

    // ── Cursor codec ─────────────────────────────────────────────────────────

    #[test]
    fn cursor_round_trips_through_opaque_token() {
        let cursor = Cursor::new("2026-03-01T10:00:00.000Z", "evt-42");
        let token = cursor.encode();

        // The token must not expose its contents verbatim.
        assert!(!token.contains("evt-42"));
        assert!(!token.contains("2026"));

        assert_eq!(Cursor::decode(&token).unwrap(), cursor);
    }

    #[test]
    fn cursor_rejects_garbage() {
        match Cursor::decode("not base64 !!") {
            Err(WardenError::InvalidCursor { reason }) => assert!(reason.contains("base64")),
            other => panic!("expected InvalidCursor, got {:?}", other),
        }
    }

    #[test]
    fn cursor_rejects_unknown_fields() {
        use base64::Engine;
        let raw = r#"{"sortKey":"a","secondaryKey":"b","tenantId":"t-1"}"#;
        let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw);

        assert!(matches!(
            Cursor::decode(&token),
            Err(WardenError::InvalidCursor { .. })
        ));
    }

    #[test]
    fn cursor_precedes_orders_by_sort_then_secondary_key() {
        let cursor = Cursor::new("b", "2");
        assert!(cursor.precedes("b", "3"));
        assert!(cursor.precedes("c", "0"));
        assert!(!cursor.precedes("b", "2"));
        assert!(!cursor.precedes("a", "9"));
    }

    // ── Canonical hashing ────────────────────────────────────────────────────

    #[test]
    fn canonical_json_sorts_object_keys_recursively() {
        let value = serde_json::json!({ "b": 1, "a": { "d": 4, "c": 3 } });
        assert_eq!(
            canonical::canonical_json_string(&value),
            r#"{"a":{"c":3,"d":4},"b":1}"#
        );
    }

    #[test]
    fn canonical_hash_is_stable_and_hex() {
        let a = serde_json::json!({ "x": [1, 2], "y": "z" });
        let b = serde_json::json!({ "y": "z", "x": [1, 2] });
        let ha = canonical::hash_canonical_json(&a);
        assert_eq!(ha, canonical::hash_canonical_json(&b));
        assert_eq!(ha.len(), 64);
        assert!(ha.chars().all(|c| c.is_ascii_hexdigit()));
    }

    // ── Wire names ───────────────────────────────────────────────────────────

    #[test]
    fn reason_codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&ReasonCode::UnknownAgentVersion).unwrap();
        assert_eq!(json, "\"UNKNOWN_AGENT_VERSION\"");
        assert_eq!(ReasonCode::UnknownAgentVersion.as_str(), "UNKNOWN_AGENT_VERSION");
    }

    #[test]
    fn agent_type_and_lifecycle_wire_names() {
        assert_eq!(
            serde_json::to_string(&AgentType::PatientFacing).unwrap(),
            "\"patient-facing\""
        );
        assert_eq!(
            serde_json::to_string(&LifecycleState::Deprecated).unwrap(),
            "\"deprecated\""
        );
    }

    #[test]
    fn misconfiguration_codes() {
        assert!(ReasonCode::UnknownPolicyId.is_misconfiguration());
        assert!(ReasonCode::UnknownViewId.is_misconfiguration());
        assert!(ReasonCode::UnsupportedTarget.is_misconfiguration());
        assert!(!ReasonCode::ValidationFailed.is_misconfiguration());
    }

    // ── GovernanceDecision ───────────────────────────────────────────────────

    #[test]
    fn decision_outcome_classification() {
        let denied = GovernanceDecision::deny(ReasonCode::ScopeDenied, AgentType::Clinical);
        assert_eq!(
            denied.outcome(),
            Some((GovernanceOutcomeKind::Denied, ReasonCode::ScopeDenied))
        );

        let warned = GovernanceDecision::allow_with_warning(
            ReasonCode::DeprecatedAgent,
            AgentType::Clinical,
        );
        assert_eq!(
            warned.outcome(),
            Some((GovernanceOutcomeKind::Warning, ReasonCode::DeprecatedAgent))
        );

        assert_eq!(GovernanceDecision::allow(AgentType::Platform).outcome(), None);
    }

    #[test]
    fn clean_allow_omits_codes_on_the_wire() {
        let json = serde_json::to_value(GovernanceDecision::allow(AgentType::Platform)).unwrap();
        assert_eq!(json, serde_json::json!({ "allowed": true, "agentType": "platform" }));
    }

    // ── Error display ────────────────────────────────────────────────────────

    #[test]
    fn collision_error_does_not_leak_key() {
        let err = WardenError::IdempotencyCollision {
            stored_hash: "aaa".to_string(),
            received_hash: "bbb".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("different payload"));
        assert!(msg.contains("aaa") && msg.contains("bbb"));
    }
}
