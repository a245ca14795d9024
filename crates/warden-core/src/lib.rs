//! # warden-core
//!
//! The seams of the WARDEN control plane.
//!
//! This crate provides:
//! - The collaborator traits (`TimelineReader`, `TelemetrySink`,
//!   `AuditEmitter`, `MetricsSink`, `MutationExecutor`)
//! - Containment helpers that log and swallow collaborator failures
//! - Compile-time cache-class markers and the `MemoCache`

pub mod cache;
pub mod contained;
pub mod traits;

pub use contained::SafeMetrics;

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use uuid::Uuid;
    use warden_contracts::{
        audit::{AuditAction, AuditOutcome, AuditRecord},
        error::{WardenError, WardenResult},
    };

    use crate::{
        cache::{cache_class_name, CachePolicy, MemoCache, MetadataOnly},
        contained::{emit_audit, SafeMetrics},
        traits::{AuditEmitter, MetricsSink},
    };

    fn record() -> AuditRecord {
        AuditRecord::new(AuditAction::PolicyExecute, AuditOutcome::Allowed, Uuid::new_v4())
    }

    // ── Mock collaborators ───────────────────────────────────────────────────

    struct FailingAudit;

    impl AuditEmitter for FailingAudit {
        fn emit(&self, _record: &AuditRecord) -> WardenResult<()> {
            Err(WardenError::AuditWriteFailed {
                reason: "sink offline".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingAudit {
        records: Mutex<Vec<AuditRecord>>,
    }

    impl AuditEmitter for RecordingAudit {
        fn emit(&self, record: &AuditRecord) -> WardenResult<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingMetrics {
        increments: Mutex<Vec<(String, u64)>>,
        fail: bool,
    }

    impl MetricsSink for CountingMetrics {
        fn increment(&self, name: &str, value: u64, _labels: &[(&str, &str)]) -> WardenResult<()> {
            if self.fail {
                return Err(WardenError::SinkFailed {
                    reason: "statsd unreachable".to_string(),
                });
            }
            self.increments.lock().unwrap().push((name.to_string(), value));
            Ok(())
        }

        fn timing(&self, _name: &str, _millis: u64, _labels: &[(&str, &str)]) -> WardenResult<()> {
            if self.fail {
                return Err(WardenError::SinkFailed {
                    reason: "statsd unreachable".to_string(),
                });
            }
            Ok(())
        }
    }

    // ── Containment ──────────────────────────────────────────────────────────

    #[test]
    fn failing_audit_is_swallowed() {
        // Must not panic or propagate.
        emit_audit(&FailingAudit, &record());
    }

    #[test]
    fn recording_audit_receives_record() {
        let audit = RecordingAudit::default();
        emit_audit(&audit, &record());

        let records = audit.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::PolicyExecute);
        assert_eq!(records[0].outcome, AuditOutcome::Allowed);
    }

    #[test]
    fn safe_metrics_forwards_and_swallows() {
        let ok = Arc::new(CountingMetrics::default());
        let metrics = SafeMetrics::new(ok.clone());
        metrics.increment("warden.signal", 2, &[("rule", "a")]);
        assert_eq!(
            ok.increments.lock().unwrap().as_slice(),
            &[("warden.signal".to_string(), 2)]
        );

        let failing = SafeMetrics::new(Arc::new(CountingMetrics {
            fail: true,
            ..Default::default()
        }));
        failing.increment("warden.signal", 1, &[]);
        failing.timing("warden.read", 5, &[]);

        SafeMetrics::disabled().increment("ignored", 1, &[]);
    }

    // ── MemoCache ────────────────────────────────────────────────────────────

    #[derive(Clone, Debug, PartialEq)]
    struct Listing(Vec<&'static str>);

    impl CachePolicy for Listing {
        type Class = MetadataOnly;
    }

    #[test]
    fn memo_cache_computes_once() {
        let cache: MemoCache<&'static str, Listing> = MemoCache::new();
        let mut calls = 0;

        let first = cache.get_or_insert_with("policies", || {
            calls += 1;
            Listing(vec!["a"])
        });
        let second = cache.get_or_insert_with("policies", || {
            calls += 1;
            Listing(vec!["b"])
        });

        assert_eq!(first, second);
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache_class_name::<Listing>(), "METADATA_ONLY");
    }

    #[test]
    fn memo_cache_does_not_store_misses() {
        let cache: MemoCache<String, Listing> = MemoCache::new();
        for i in 0..100 {
            assert_eq!(cache.get_or_try_insert_with(format!("bogus-{i}"), || None), None);
        }
        assert!(cache.is_empty());

        let hit = cache.get_or_try_insert_with("views".to_string(), || Some(Listing(vec!["v"])));
        let again = cache.get_or_try_insert_with("views".to_string(), || None);
        assert_eq!(hit, again);
        assert_eq!(cache.len(), 1);
    }
}
