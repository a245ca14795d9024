//! Containment wrappers for fire-and-forget collaborators.
//!
//! Audit, telemetry, and metrics failures must never abort the operation that
//! triggered them. These helpers log the failure with `tracing` and return.

use std::sync::Arc;

use tracing::warn;

use warden_contracts::{audit::AuditRecord, telemetry::RawEvent};

use crate::traits::{AuditEmitter, MetricsSink, TelemetrySink};

/// Emit `record`, logging and swallowing any failure.
pub fn emit_audit(emitter: &dyn AuditEmitter, record: &AuditRecord) {
    if let Err(e) = emitter.emit(record) {
        warn!(
            action = ?record.action,
            outcome = ?record.outcome,
            execution_id = %record.execution_id,
            error = %e,
            "audit emission failed; continuing"
        );
    }
}

/// Record `event`, logging and swallowing any failure.
pub fn record_telemetry(sink: &dyn TelemetrySink, event: RawEvent) {
    let event_type = event.event_type();
    if let Err(e) = sink.record(event) {
        warn!(event_type = %event_type, error = %e, "telemetry record failed; continuing");
    }
}

/// A `MetricsSink` wrapper whose methods cannot fail.
#[derive(Clone)]
pub struct SafeMetrics {
    inner: Option<Arc<dyn MetricsSink>>,
}

impl SafeMetrics {
    pub fn new(inner: Arc<dyn MetricsSink>) -> Self {
        Self { inner: Some(inner) }
    }

    /// A wrapper that drops every measurement.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn increment(&self, name: &str, value: u64, labels: &[(&str, &str)]) {
        if let Some(sink) = &self.inner {
            if let Err(e) = sink.increment(name, value, labels) {
                warn!(metric = name, error = %e, "metrics increment failed");
            }
        }
    }

    pub fn timing(&self, name: &str, millis: u64, labels: &[(&str, &str)]) {
        if let Some(sink) = &self.inner {
            if let Err(e) = sink.timing(name, millis, labels) {
                warn!(metric = name, error = %e, "metrics timing failed");
            }
        }
    }
}

impl Default for SafeMetrics {
    fn default() -> Self {
        Self::disabled()
    }
}
