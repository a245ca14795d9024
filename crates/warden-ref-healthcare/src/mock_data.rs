//! Simulated healthcare collaborators for the WARDEN reference runtime.
//!
//! All data in this module is hardcoded and fictional. The consent ledger
//! stands in for the clinical systems a real mutation executor would call.

use std::{collections::BTreeMap, sync::Mutex};

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use warden_contracts::{
    error::{WardenError, WardenResult},
    mutation::MutationCommand,
    telemetry::{RawToolGatewayEvent, ToolErrorCode, ToolOutcome},
};
use warden_core::traits::MutationExecutor;
use warden_gateway::MutationToolSpec;
use warden_signals::WriteTools;

/// Patient reference the ledger treats as unreachable, for failure demos.
pub const UNAVAILABLE_PATIENT: &str = "PT-0000";

// ── Mutation tools ───────────────────────────────────────────────────────────

/// The mutating tools the reference gateway accepts.
pub fn mutation_tools() -> Vec<MutationToolSpec> {
    vec![
        MutationToolSpec {
            tool_name: "consent.recordDecision".to_string(),
            version: "1".to_string(),
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "patientRef": { "type": "string", "pattern": "^PT-[0-9]{4}$" },
                    "decision": { "enum": ["granted", "revoked"] },
                    "purpose": { "type": "string", "maxLength": 64 }
                },
                "required": ["patientRef", "decision"],
                "additionalProperties": false
            }),
        },
        MutationToolSpec {
            tool_name: "appointment.book".to_string(),
            version: "1".to_string(),
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "patientRef": { "type": "string", "pattern": "^PT-[0-9]{4}$" },
                    "slotId": { "type": "string", "minLength": 1 }
                },
                "required": ["patientRef", "slotId"],
                "additionalProperties": false
            }),
        },
    ]
}

/// Tools whose calls change state, for the approval signal engine.
pub fn write_tools() -> WriteTools {
    WriteTools::standard()
}

// ── Consent ledger ───────────────────────────────────────────────────────────

/// In-memory stand-in for the consent and scheduling back ends.
#[derive(Debug, Default)]
pub struct ConsentLedger {
    decisions: Mutex<BTreeMap<String, String>>,
    bookings: Mutex<BTreeMap<String, String>>,
    calls: Mutex<usize>,
}

impl ConsentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current consent decision per patient reference.
    pub fn decisions(&self) -> BTreeMap<String, String> {
        match self.decisions.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// How many times the gateway has dispatched to this ledger.
    pub fn calls(&self) -> usize {
        match self.calls.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn write(map: &Mutex<BTreeMap<String, String>>, key: &str, value: &str) -> WardenResult<()> {
        let mut map = map.lock().map_err(|_| WardenError::ExecutorFailed {
            reason: "ledger lock poisoned".to_string(),
        })?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl MutationExecutor for ConsentLedger {
    fn execute(&self, command: &MutationCommand) -> WardenResult<Value> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }

        let patient = string_param(&command.parameters, "patientRef")?;
        if patient == UNAVAILABLE_PATIENT {
            return Err(WardenError::ExecutorFailed {
                reason: "consent registry did not respond".to_string(),
            });
        }

        match command.tool_name.as_str() {
            "consent.recordDecision" => {
                let decision = string_param(&command.parameters, "decision")?;
                Self::write(&self.decisions, patient, decision)?;
                Ok(json!({ "patientRef": patient, "decision": decision, "status": "recorded" }))
            }
            "appointment.book" => {
                let slot = string_param(&command.parameters, "slotId")?;
                Self::write(&self.bookings, slot, patient)?;
                Ok(json!({ "slotId": slot, "status": "confirmed" }))
            }
            other => Err(WardenError::ExecutorFailed {
                reason: format!("no back end for tool '{}'", other),
            }),
        }
    }
}

fn string_param<'a>(parameters: &'a Value, name: &str) -> WardenResult<&'a str> {
    parameters[name]
        .as_str()
        .ok_or_else(|| WardenError::ExecutorFailed {
            reason: format!("parameter '{}' missing after validation", name),
        })
}

// ── Tool gateway telemetry ───────────────────────────────────────────────────

/// A tool gateway record as the healthcare gateway would store it.
///
/// Tenant, actor and request identifiers are filled in so the demos show them
/// being stripped on the way to the timeline.
pub fn tool_call(
    sequence: usize,
    agent_id: &str,
    agent_version: &str,
    policy_snapshot_hash: &str,
    tool_name: &str,
    allowed: bool,
    at: DateTime<Utc>,
) -> RawToolGatewayEvent {
    RawToolGatewayEvent {
        request_id: format!("req-{:05}", sequence),
        tenant_id: "st-marys-clinic".to_string(),
        actor_id: format!("patient-{:04}", 1000 + sequence % 7),
        actor_type: "patient".to_string(),
        idempotency_key: None,
        agent_id: agent_id.to_string(),
        agent_version: agent_version.to_string(),
        policy_snapshot_hash: policy_snapshot_hash.to_string(),
        tool_name: tool_name.to_string(),
        outcome: if allowed {
            ToolOutcome::Succeeded
        } else {
            ToolOutcome::Denied
        },
        error_code: (!allowed).then_some(ToolErrorCode::Forbidden),
        duration_ms: Some(if allowed { 42 } else { 3 }),
        payload: json!({ "message": "I need to move my appointment to Friday" }),
        timestamp: at,
    }
}

#[cfg(test)]
mod tests {
    use warden_gateway::MutationToolRegistry;

    use super::*;

    fn command(tool: &str, parameters: Value) -> MutationCommand {
        MutationCommand {
            tenant_id: "st-marys-clinic".to_string(),
            actor_id: "clinician-12".to_string(),
            idempotency_key: "k-1".to_string(),
            tool_name: tool.to_string(),
            tool_version: "1".to_string(),
            parameters,
            approval: None,
        }
    }

    #[test]
    fn reference_tools_compile() {
        let registry = MutationToolRegistry::new(mutation_tools()).unwrap();
        let consent = registry.resolve("consent.recordDecision", "1").unwrap();
        assert!(consent
            .validate_parameters(&json!({ "patientRef": "PT-1234", "decision": "granted" }))
            .is_empty());
        assert!(!consent
            .validate_parameters(&json!({ "patientRef": "1234", "decision": "granted" }))
            .is_empty());
    }

    #[test]
    fn ledger_records_and_fails() {
        let ledger = ConsentLedger::new();
        let out = ledger
            .execute(&command(
                "consent.recordDecision",
                json!({ "patientRef": "PT-1234", "decision": "revoked" }),
            ))
            .unwrap();
        assert_eq!(out["status"], "recorded");
        assert_eq!(ledger.decisions()["PT-1234"], "revoked");

        let err = ledger.execute(&command(
            "consent.recordDecision",
            json!({ "patientRef": UNAVAILABLE_PATIENT, "decision": "granted" }),
        ));
        assert!(matches!(err, Err(WardenError::ExecutorFailed { .. })));
        assert_eq!(ledger.calls(), 2);
    }

    #[test]
    fn write_tool_set() {
        let tools = write_tools();
        for tool in ["chat.sendMessage", "appointment.book", "consent.recordDecision"] {
            assert!(tools.contains(tool), "{tool}");
        }
        for tool in ["consent.getStatus", "medical_advisor.getAdvice", "records.export"] {
            assert!(!tools.contains(tool), "{tool}");
        }
    }
}
