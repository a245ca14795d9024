//! WARDEN Healthcare Reference Runtime: Demo CLI
//!
//! Runs one or all of the three reference scenarios. Each scenario uses real
//! WARDEN components (policy evaluator, signal engines, timeline, operator
//! API, mutation gateway, audit store) wired around a fictional clinic.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- governance
//!   cargo run -p demo -- operator
//!   cargo run -p demo -- mutation

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use warden_contracts::error::WardenResult;
use warden_ref_healthcare::scenarios::{governance, mutation_idempotency, operator_console};

// ── CLI definition ────────────────────────────────────────────────────────────

/// WARDEN: governance and observability for agent tool calls.
///
/// Each subcommand runs one or all of the reference scenarios against the
/// bundled healthcare agent registry.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "WARDEN healthcare reference runtime demo",
    long_about = "Runs WARDEN reference scenarios showing policy decisions, derived signals,\n\
                  sanitized operator reads, audited executions and idempotent mutations."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three scenarios in sequence.
    RunAll,
    /// Scenario 1: Governance Decisions (evaluator, signals, lifecycle).
    Governance,
    /// Scenario 2: Operator Console (timeline, agents, executions).
    Operator,
    /// Scenario 3: Mutation Idempotency (replay, collision, approval).
    Mutation,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // RUST_LOG=debug for per-decision output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::Governance => governance::run_scenario(),
        Command::Operator => operator_console::run_scenario(),
        Command::Mutation => mutation_idempotency::run_scenario(),
    };

    match result {
        Ok(()) => {
            info!("demo finished");
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_all() -> WardenResult<()> {
    governance::run_scenario()?;
    operator_console::run_scenario()?;
    mutation_idempotency::run_scenario()?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("WARDEN: Agent Governance Control Plane");
    println!("Healthcare Reference Demo");
    println!("======================================");
    println!();
    println!("Per tool call:");
    println!("  [1] Evaluator checks agent version, lifecycle and tool scope");
    println!("  [2] Non-clean decisions become governance telemetry");
    println!("  [3] Signal engines derive approval and abuse signals");
    println!("  [4] Operators read a sanitized, registry-joined timeline");
    println!("  [5] Mutations pass approval and idempotency checks; every step is audited");
    println!();
}
