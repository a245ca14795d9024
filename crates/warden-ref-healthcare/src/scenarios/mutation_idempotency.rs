//! Scenario 3: Mutation Idempotency
//!
//! A clinician records a consent decision through the mutation gateway:
//!
//! Step A: first submission dispatches once and succeeds
//! Step B: network retry with the same key replays the stored result
//! Step C: same key, different decision: idempotency collision
//! Step D: no approval attached: rejected, never dispatched
//! Step E: unsupported tool version: rejected
//! Step F: back end down: terminal failure, replayed on retry
//!
//! The consent ledger is called exactly twice across all six steps.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use warden_audit::InMemoryAuditStore;
use warden_contracts::{
    error::{WardenError, WardenResult},
    mutation::{ApprovalRecord, MutationCommand, MutationResult, MutationStatus},
};
use warden_gateway::{MutationGateway, MutationToolRegistry};

use crate::mock_data::{mutation_tools, ConsentLedger, UNAVAILABLE_PATIENT};

/// What each step produced.
#[derive(Debug)]
pub struct MutationReport {
    pub first: MutationResult,
    pub retry: MutationResult,
    pub collision: WardenResult<MutationResult>,
    pub unapproved: MutationResult,
    pub wrong_version: MutationResult,
    pub failed: MutationResult,
    pub failed_retry: MutationResult,
    pub ledger_calls: usize,
    pub audit_records: usize,
    pub audit_verified: bool,
}

fn consent_command(key: &str, patient: &str, decision: &str) -> MutationCommand {
    MutationCommand {
        tenant_id: "st-marys-clinic".to_string(),
        actor_id: "clinician-0012".to_string(),
        idempotency_key: key.to_string(),
        tool_name: "consent.recordDecision".to_string(),
        tool_version: "1".to_string(),
        parameters: json!({
            "patientRef": patient,
            "decision": decision,
            "purpose": "research-registry",
        }),
        approval: Some(ApprovalRecord {
            approval_id: "apr-2026-0311".to_string(),
            approver_role: "privacy-officer".to_string(),
            approved_at: Utc::now(),
        }),
    }
}

/// Run all six steps against a fresh gateway.
pub fn simulate() -> WardenResult<MutationReport> {
    let ledger = Arc::new(ConsentLedger::new());
    let audit = Arc::new(InMemoryAuditStore::new());
    let gateway = MutationGateway::new(
        MutationToolRegistry::new(mutation_tools())?,
        ledger.clone(),
        audit.clone(),
    );

    let first = gateway.submit(&consent_command("consent-7f3a", "PT-4821", "granted"))?;
    let retry = gateway.submit(&consent_command("consent-7f3a", "PT-4821", "granted"))?;
    let collision = gateway.submit(&consent_command("consent-7f3a", "PT-4821", "revoked"));

    let mut unapproved = consent_command("consent-9b10", "PT-4821", "revoked");
    unapproved.approval = None;
    let unapproved = gateway.submit(&unapproved)?;

    let mut wrong_version = consent_command("consent-9b11", "PT-4821", "revoked");
    wrong_version.tool_version = "2".to_string();
    let wrong_version = gateway.submit(&wrong_version)?;

    let failed = gateway.submit(&consent_command("consent-c001", UNAVAILABLE_PATIENT, "granted"))?;
    let failed_retry =
        gateway.submit(&consent_command("consent-c001", UNAVAILABLE_PATIENT, "granted"))?;

    Ok(MutationReport {
        first,
        retry,
        collision,
        unapproved,
        wrong_version,
        failed,
        failed_retry,
        ledger_calls: ledger.calls(),
        audit_records: audit.len(),
        audit_verified: audit.verify_integrity(),
    })
}

fn describe(result: &MutationResult) -> String {
    match result.reason_code {
        Some(code) => format!("{:?} ({})", result.status, code),
        None => format!("{:?}", result.status),
    }
}

// ── Scenario runner ───────────────────────────────────────────────────────────

/// Run Scenario 3: Mutation Idempotency.
pub fn run_scenario() -> WardenResult<()> {
    println!("=== Scenario 3: Mutation Idempotency ===");
    println!();

    let report = simulate()?;

    println!("  Step A  first submission:      {}", describe(&report.first));
    println!(
        "  Step B  retry, same payload:   {} (same execution: {})",
        describe(&report.retry),
        report.retry.execution_id == report.first.execution_id
    );
    match &report.collision {
        Err(WardenError::IdempotencyCollision { .. }) => {
            println!("  Step C  retry, new payload:    COLLISION (refused)")
        }
        Err(e) => println!("  Step C  retry, new payload:    error: {}", e),
        Ok(result) => println!("  Step C  retry, new payload:    {}", describe(result)),
    }
    println!("  Step D  no approval:           {}", describe(&report.unapproved));
    println!("  Step E  tool version 2:        {}", describe(&report.wrong_version));
    println!("  Step F  back end down:         {}", describe(&report.failed));
    println!(
        "  Step F  retry:                 {} (replayed: {})",
        describe(&report.failed_retry),
        report.failed_retry == report.failed
    );
    println!();
    println!("  Ledger dispatches:      {}", report.ledger_calls);
    println!(
        "  Audit chain integrity:  {} ({} record(s) in chain)",
        if report.audit_verified { "VERIFIED" } else { "FAILED" },
        report.audit_records
    );
    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(())
}
