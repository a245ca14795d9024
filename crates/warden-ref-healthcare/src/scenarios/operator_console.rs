//! Scenario 2: Operator Console
//!
//! An operator inspecting the control plane after the governance traffic:
//!
//! - catalog listings (v1 latest-only, v2 full version history)
//! - a paginated, sanitized timeline walk
//! - the agent registry and the enriched timeline
//! - policy and saved-view executions, including a pinned v2 run and an
//!   unknown policy that draws a compliance review
//!
//! Every call lands in a hash-chained audit store, verified at the end.

use std::sync::Arc;

use serde_json::{json, Value};

use warden_contracts::error::WardenResult;
use warden_audit::InMemoryAuditStore;
use warden_operator::{DefaultDecisionHook, ExecutionResultDto, OperatorApi, PolicyCatalog};
use warden_policy::AgentRegistry;
use warden_timeline::{
    InMemoryTimelineReader, JoinedAgent, TimelineAggregator, TimelineSource, ToolAllowlist,
};

use crate::{
    reference_registry,
    scenarios::governance::{scenario_start, simulate_traffic},
};

/// Wire an operator API over `store` for `registry`, auditing into `audit`.
pub fn build_console(
    registry: &AgentRegistry,
    store: Arc<InMemoryTimelineReader>,
    audit: Arc<InMemoryAuditStore>,
) -> WardenResult<OperatorApi> {
    let source = TimelineSource::new(
        store,
        TimelineAggregator::new(ToolAllowlist::from_registry(registry)),
    );
    Ok(
        OperatorApi::new(Arc::new(PolicyCatalog::builtin()?), source, registry, audit)
            .with_decision_hook(Arc::new(DefaultDecisionHook)),
    )
}

fn print_execution(label: &str, result: &ExecutionResultDto) {
    let reason = result
        .reason_code
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    let decision = result
        .decision
        .as_ref()
        .and_then(|d| serde_json::to_string(d).ok())
        .unwrap_or_else(|| "none".to_string());
    println!(
        "    {:<34} {:?} count={} next={} reason={} decision={}",
        label,
        result.outcome,
        result.page_info.count,
        result.page_info.has_next_page,
        reason,
        decision
    );
}

// ── Scenario runner ───────────────────────────────────────────────────────────

/// Run Scenario 2: Operator Console.
pub fn run_scenario() -> WardenResult<()> {
    println!("=== Scenario 2: Operator Console ===");
    println!();

    let registry = reference_registry()?;
    let store = Arc::new(InMemoryTimelineReader::new());
    simulate_traffic(&registry, store.clone(), scenario_start());
    let audit = Arc::new(InMemoryAuditStore::new());
    let console = build_console(&registry, store, audit.clone())?;

    // ── Catalog ───────────────────────────────────────────────────────────────

    println!(
        "  Policies: {} latest, {} versions total",
        console.list_policies().count,
        console.list_policies_v2().count
    );
    println!(
        "  Views:    {} latest, {} versions total",
        console.list_views().count,
        console.list_views_v2().count
    );
    println!();

    // ── Timeline walk ─────────────────────────────────────────────────────────

    let mut filters = json!({ "limit": 10 });
    let mut pages = 0;
    let mut events = 0;
    loop {
        let page = console.get_timeline(&filters)?;
        pages += 1;
        events += page.count;
        match page.next_cursor {
            Some(cursor) => filters = json!({ "limit": 10, "cursor": cursor }),
            None => break,
        }
    }
    println!("  Timeline:  {} events over {} pages of 10", events, pages);

    let first = console.get_timeline(&json!({ "limit": 1 }))?;
    if let Some(event) = first.items.first() {
        let shown = serde_json::to_string(event).unwrap_or_default();
        println!("  First event (sanitized): {}", shown);
    }

    let agents = console.get_agents(&json!({ "lifecycleState": "active" }))?;
    println!("  Active agent versions:  {}", agents.count);

    let enriched = console.get_enriched_timeline(&json!({ "limit": 200 }))?;
    let unknown = enriched
        .items
        .iter()
        .filter(|e| e.agent == JoinedAgent::Unknown)
        .count();
    println!(
        "  Enriched timeline:      {} events, {} without a registry match",
        enriched.count, unknown
    );
    println!();

    // ── Executions ────────────────────────────────────────────────────────────

    println!("  Executions:");
    print_execution(
        "view denials-console",
        &console.execute_view("denials-console", None, &Value::Null),
    );
    print_execution(
        "policy governance-denials",
        &console.execute_policy("governance-denials", None, &Value::Null),
    );
    print_execution(
        "policy governance-denials@1 (v2)",
        &console.execute_policy_v2("governance-denials", Some("1"), &Value::Null),
    );
    print_execution(
        "view agent-inventory (v2)",
        &console.execute_view_v2("agent-inventory", None, &Value::Null),
    );
    print_execution(
        "policy phi-export (v2)",
        &console.execute_policy_v2("phi-export", None, &Value::Null),
    );
    print_execution(
        "policy governance-denials + limit",
        &console.execute_policy("governance-denials", None, &json!({ "limit": 500 })),
    );
    println!();

    // ── Audit ─────────────────────────────────────────────────────────────────

    let log = audit.export_log()?;
    println!(
        "  Audit chain integrity:  {} ({} record(s) in chain)",
        if audit.verify_integrity() { "VERIFIED" } else { "FAILED" },
        log.entries.len()
    );
    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok(())
}
