//! # warden-signals
//!
//! Signal derivation from tool and governance telemetry.
//!
//! - [`abuse`]: sliding-window rules over invocation outcomes.
//! - [`approval`]: escalation severity for governance denials and warnings.
//!
//! Neither engine can fail its caller. Sink and metrics failures are logged
//! and swallowed.

pub mod abuse;
pub mod approval;

pub use abuse::{AbuseEngineConfig, AbuseRule, AbuseSignal, AbuseSignalEngine, InvocationObservation};
pub use approval::{classify, ApprovalSignalEngine, WriteTools};
