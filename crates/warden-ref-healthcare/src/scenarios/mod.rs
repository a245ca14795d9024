//! Reference scenarios.
//!
//! Each scenario wires real WARDEN components (policy evaluator, signal
//! engines, timeline reader, operator API, mutation gateway, audit store)
//! around the mock clinic in [`crate::mock_data`] and prints what an
//! operator would see.

pub mod governance;
pub mod mutation_idempotency;
pub mod operator_console;
