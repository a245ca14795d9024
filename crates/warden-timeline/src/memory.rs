//! In-process event store used by tests and the demo.

use std::sync::Mutex;

use warden_contracts::{
    error::{WardenError, WardenResult},
    telemetry::{RawEvent, TimelineQuery},
};
use warden_core::traits::{TelemetrySink, TimelineReader};

/// Stores raw events in insertion order. Acts as both reader and sink.
#[derive(Debug, Default)]
pub struct InMemoryTimelineReader {
    events: Mutex<Vec<RawEvent>>,
}

impl InMemoryTimelineReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<RawEvent>) -> Self {
        Self {
            events: Mutex::new(events),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> WardenResult<std::sync::MutexGuard<'_, Vec<RawEvent>>> {
        self.events.lock().map_err(|_| WardenError::ReaderFailed {
            reason: "event store lock poisoned".to_string(),
        })
    }
}

/// Natural id of a stored event: the request id, where there is one.
fn natural_id(event: &RawEvent) -> Option<&str> {
    match event {
        RawEvent::ToolGateway(e) => Some(&e.request_id),
        RawEvent::GovernanceControl(e) => e.request_id.as_deref(),
        RawEvent::ApprovalSignal(e) => e.request_id.as_deref(),
        RawEvent::LifecycleTransition(e) => e.request_id.as_deref(),
    }
}

impl TimelineReader for InMemoryTimelineReader {
    fn query(&self, query: &TimelineQuery) -> WardenResult<Vec<RawEvent>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }

    fn get_event(&self, id: &str) -> WardenResult<Option<RawEvent>> {
        Ok(self
            .lock()?
            .iter()
            .find(|e| natural_id(e) == Some(id))
            .cloned())
    }
}

impl TelemetrySink for InMemoryTimelineReader {
    fn record(&self, event: RawEvent) -> WardenResult<()> {
        self.events
            .lock()
            .map_err(|_| WardenError::SinkFailed {
                reason: "event store lock poisoned".to_string(),
            })?
            .push(event);
        Ok(())
    }
}
