//! # warden-timeline
//!
//! The unified, sanitized, chronological event log.
//!
//! Raw telemetry comes in four shapes (tool gateway, governance control,
//! approval signal, lifecycle transition). The [`TimelineAggregator`] maps
//! each to a [`TimelineEvent`] that carries only allow-listed fields, and the
//! [`TimelineJoiner`] attaches registry metadata on
//! `(agentVersion, policySnapshotHash)`.

pub mod aggregator;
pub mod allowlist;
pub mod event;
pub mod joiner;
pub mod memory;
pub mod source;

pub use aggregator::{format_timestamp, sort_chronologically, TimelineAggregator};
pub use allowlist::{ToolAllowlist, UNKNOWN_TOOL};
pub use event::{TimelineDetail, TimelineEvent};
pub use joiner::{AgentSummary, EnrichedTimelineEvent, JoinedAgent, TimelineJoiner};
pub use memory::InMemoryTimelineReader;
pub use source::TimelineSource;
