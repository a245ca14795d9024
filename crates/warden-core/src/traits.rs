//! Collaborator trait definitions.
//!
//! The control plane never performs I/O itself. Everything it reads from or
//! writes to lives behind one of these traits and is injected at construction:
//!
//! - `TimelineReader`: the external event store (read side)
//! - `TelemetrySink`: the external event store (write side)
//! - `AuditEmitter`: the audit trail, fire-and-forget
//! - `MetricsSink`: counters and timings
//! - `MutationExecutor`: the real tool backend behind the mutation gateway
//!
//! All implementations must be `Send + Sync`; the stateful parts of the core
//! guard their own state.

use warden_contracts::{
    audit::AuditRecord,
    error::WardenResult,
    mutation::MutationCommand,
    telemetry::{RawEvent, TimelineQuery},
};

/// Read access to stored raw telemetry.
///
/// Only the timeline aggregator consumes the events this returns.
pub trait TimelineReader: Send + Sync {
    /// Return every stored event matching `query`, in any order.
    fn query(&self, query: &TimelineQuery) -> WardenResult<Vec<RawEvent>>;

    /// Look up one event by its natural id (the request id for gateway events).
    fn get_event(&self, id: &str) -> WardenResult<Option<RawEvent>>;
}

/// Write access to the raw telemetry store.
///
/// Used by the lifecycle governor and the approval signal engine. Callers
/// treat failures as non-fatal.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: RawEvent) -> WardenResult<()>;
}

/// The audit trail.
///
/// Emission is fire-and-forget from the caller's point of view: an `Err` here
/// is logged and swallowed at the call site and never changes the result of
/// the operation being audited.
pub trait AuditEmitter: Send + Sync {
    fn emit(&self, record: &AuditRecord) -> WardenResult<()>;
}

/// Counter and timing sink. Wrap in `SafeMetrics` before use.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str, value: u64, labels: &[(&str, &str)]) -> WardenResult<()>;

    fn timing(&self, name: &str, millis: u64, labels: &[(&str, &str)]) -> WardenResult<()>;
}

/// The real tool backend a validated, approved, deduplicated mutation is
/// dispatched to.
///
/// Called at most once per unique idempotency key. Retries, timeouts and
/// backpressure are the implementation's concern.
pub trait MutationExecutor: Send + Sync {
    fn execute(&self, command: &MutationCommand) -> WardenResult<serde_json::Value>;
}
