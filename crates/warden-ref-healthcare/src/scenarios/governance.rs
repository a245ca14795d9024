//! Scenario 1: Governance Decisions
//!
//! Drives simulated patient-portal, consent and scheduling traffic through
//! the policy evaluator and shows what the control plane derives from it:
//!
//! - one decision per tool call (allow, allow with warning, deny)
//! - governance control telemetry for every non-clean decision
//! - approval/escalation signals classified from those decisions
//! - an abuse signal from a burst of forbidden calls
//! - one approved and one rejected lifecycle transition
//!
//! [`simulate_traffic`] is also used by the operator console scenario to
//! populate its event store.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use warden_contracts::{
    agent::LifecycleState,
    error::WardenResult,
    governance::{GovernanceDecision, TransitionDecision},
    telemetry::{RawApprovalSignalEvent, RawEvent, RawGovernanceEvent},
};
use warden_core::{contained::record_telemetry, traits::TelemetrySink, SafeMetrics};
use warden_policy::{
    policy_hash, AgentRegistry, LifecycleGovernor, PolicyEvaluator, TransitionRequest,
};
use warden_signals::{AbuseEngineConfig, AbuseSignal, AbuseSignalEngine, ApprovalSignalEngine};

use crate::{
    mock_data::{tool_call, write_tools},
    reference_registry,
};

/// The tool calls the scenario replays, in order.
const CASES: [(&str, &str, &str); 8] = [
    ("patient-portal-agent", "1.0.0", "chat.sendMessage"),
    ("patient-portal-agent", "1.0.0", "consent.recordDecision"),
    ("consent-agent", "deprecated-v1", "consent.recordDecision"),
    ("consent-agent", "0.9.0", "consent.getStatus"),
    ("research-agent", "1.0.0", "chat.sendMessage"),
    ("scheduling-agent", "1.4.2", "records.export"),
    ("patient-portal-agent", "2.0.0-beta", "medical_advisor.getAdvice"),
    ("scheduling-agent", "0.1.0", "appointment.book"),
];

/// Forbidden calls replayed after the cases to trip abuse rule B.
const BURST: usize = 5;

/// One evaluated tool call.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub agent_id: String,
    pub agent_version: String,
    pub tool_name: String,
    pub decision: GovernanceDecision,
}

/// Everything the traffic produced.
#[derive(Debug, Clone)]
pub struct GovernanceReport {
    pub cases: Vec<CaseOutcome>,
    pub approval_signals: Vec<RawApprovalSignalEvent>,
    pub abuse_signals: Vec<AbuseSignal>,
    pub deprecation: TransitionDecision,
    pub revival: TransitionDecision,
    pub hash_before: String,
    pub hash_after: String,
}

/// Replay the reference traffic against `registry`, recording every raw
/// event into `sink`.
pub fn simulate_traffic(
    registry: &AgentRegistry,
    sink: Arc<dyn TelemetrySink>,
    start: DateTime<Utc>,
) -> GovernanceReport {
    let evaluator = PolicyEvaluator::new(Arc::new(registry.clone()));
    let approvals =
        ApprovalSignalEngine::new(write_tools(), Arc::clone(&sink), SafeMetrics::disabled());
    let abuse = AbuseSignalEngine::new(AbuseEngineConfig::default(), SafeMetrics::disabled());
    let hash_before = policy_hash(registry);

    let burst = (0..BURST).map(|_| ("patient-portal-agent", "1.0.0", "appointment.book"));
    let calls: Vec<(&str, &str, &str)> = CASES.iter().copied().chain(burst).collect();

    let mut cases = Vec::new();
    let mut approval_signals = Vec::new();
    let mut abuse_signals = Vec::new();

    for (i, (agent_id, agent_version, tool_name)) in calls.into_iter().enumerate() {
        let at = start + Duration::seconds(30 * i as i64);
        let decision = evaluator.evaluate(agent_id, agent_version, tool_name);

        let call = tool_call(
            i,
            agent_id,
            agent_version,
            &hash_before,
            tool_name,
            decision.allowed,
            at,
        );
        abuse_signals.extend(abuse.observe_event(&call));
        record_telemetry(sink.as_ref(), RawEvent::ToolGateway(call));

        if let Some((kind, reason_code)) = decision.outcome() {
            let event = RawGovernanceEvent {
                request_id: Some(format!("req-{:05}", i)),
                tenant_id: Some("st-marys-clinic".to_string()),
                actor_id: None,
                agent_id: agent_id.to_string(),
                agent_version: agent_version.to_string(),
                policy_snapshot_hash: hash_before.clone(),
                tool_name: tool_name.to_string(),
                decision: kind,
                reason_code,
                payload: serde_json::Value::Null,
                timestamp: at,
            };
            record_telemetry(sink.as_ref(), RawEvent::GovernanceControl(event.clone()));
            approval_signals.extend(approvals.process(&event));
        }

        cases.push(CaseOutcome {
            agent_id: agent_id.to_string(),
            agent_version: agent_version.to_string(),
            tool_name: tool_name.to_string(),
            decision,
        });
    }

    let governor = LifecycleGovernor::new(sink);
    let deprecation = governor.request_transition(
        registry,
        &TransitionRequest {
            agent_id: "consent-agent".to_string(),
            version: "1.0.0".to_string(),
            to: LifecycleState::Deprecated,
            requested_by: Some("governance-board".to_string()),
            request_id: Some("chg-0042".to_string()),
        },
    );
    let revival = governor.request_transition(
        registry,
        &TransitionRequest {
            agent_id: "scheduling-agent".to_string(),
            version: "0.1.0".to_string(),
            to: LifecycleState::Active,
            requested_by: Some("on-call".to_string()),
            request_id: Some("chg-0043".to_string()),
        },
    );
    let hash_after = deprecation
        .registry
        .as_ref()
        .map_or_else(|| hash_before.clone(), policy_hash);

    GovernanceReport {
        cases,
        approval_signals,
        abuse_signals,
        deprecation: deprecation.decision,
        revival: revival.decision,
        hash_before,
        hash_after,
    }
}

/// Fixed start time so repeated runs produce the same timeline.
pub fn scenario_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ── Scenario runner ───────────────────────────────────────────────────────────

/// Run Scenario 1: Governance Decisions.
pub fn run_scenario() -> WardenResult<()> {
    println!("=== Scenario 1: Governance Decisions ===");
    println!();

    let registry = reference_registry()?;
    let store = Arc::new(warden_timeline::InMemoryTimelineReader::new());
    let report = simulate_traffic(&registry, store.clone(), scenario_start());

    println!("  Policy decisions:");
    for case in &report.cases {
        let verdict = match (case.decision.allowed, case.decision.outcome()) {
            (true, None) => "ALLOW".to_string(),
            (true, Some((_, code))) => format!("ALLOW (warning {})", code),
            (false, Some((_, code))) => format!("DENY  {}", code),
            (false, None) => "DENY".to_string(),
        };
        println!(
            "    {:<22} {:<14} {:<27} {}",
            case.agent_id, case.agent_version, case.tool_name, verdict
        );
    }
    println!();

    println!("  Approval signals:       {}", report.approval_signals.len());
    for signal in report.approval_signals.iter().take(3) {
        println!(
            "    {} on {} -> severity {} (level {})",
            signal.reason_code, signal.tool_name, signal.severity, signal.escalation_level
        );
    }
    println!("  Abuse signals:          {}", report.abuse_signals.len());
    for signal in &report.abuse_signals {
        println!(
            "    rule {} on {}: {} events (threshold {})",
            signal.rule_id.id(),
            signal.tool_name,
            signal.observed_count,
            signal.threshold
        );
    }
    println!();

    println!(
        "  Deprecate consent-agent@1.0.0:  {}",
        if report.deprecation.allowed { "APPROVED" } else { "REJECTED" }
    );
    println!(
        "  Revive scheduling-agent@0.1.0:  {}",
        if report.revival.allowed { "APPROVED" } else { "REJECTED" }
    );
    println!("  Policy hash before:     {}", &report.hash_before[..16]);
    println!("  Policy hash after:      {}", &report.hash_after[..16]);
    println!("  Raw events recorded:    {}", store.len());
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(())
}
