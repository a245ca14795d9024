//! Timeline reads: reader → aggregator → cursor window.

use std::sync::Arc;

use tracing::debug;

use warden_contracts::{cursor::Cursor, error::WardenResult, telemetry::TimelineQuery};
use warden_core::traits::TimelineReader;

use crate::{aggregator::TimelineAggregator, event::TimelineEvent};

/// The only path from stored telemetry to timeline events.
#[derive(Clone)]
pub struct TimelineSource {
    reader: Arc<dyn TimelineReader>,
    aggregator: TimelineAggregator,
}

impl TimelineSource {
    pub fn new(reader: Arc<dyn TimelineReader>, aggregator: TimelineAggregator) -> Self {
        Self { reader, aggregator }
    }

    /// Up to `fetch` events strictly after `after`, in chronological order.
    pub fn read_page(
        &self,
        query: &TimelineQuery,
        after: Option<&Cursor>,
        fetch: usize,
    ) -> WardenResult<Vec<TimelineEvent>> {
        let raw = self.reader.query(query)?;
        let events: Vec<TimelineEvent> = self
            .aggregator
            .aggregate(&raw)
            .into_iter()
            .filter(|e| after.map_or(true, |c| c.precedes(e.timestamp(), e.event_id())))
            .take(fetch)
            .collect();
        debug!(read = raw.len(), returned = events.len(), "timeline page read");
        Ok(events)
    }

    /// The sanitized form of one stored event, looked up by its store id.
    pub fn get_event(&self, id: &str) -> WardenResult<Option<TimelineEvent>> {
        Ok(self.reader.get_event(id)?.map(|raw| self.aggregator.map(&raw)))
    }
}
