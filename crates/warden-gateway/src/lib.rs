//! # warden-gateway
//!
//! Validated, deduplicated dispatch of mutating tool commands.
//!
//! - [`MutationToolRegistry`]: fixed allow-list of `(tool, version)` pairs with
//!   JSON Schema parameter validation.
//! - [`IdempotencyStore`]: `(tenantId, idempotencyKey)` → terminal result.
//! - [`MutationGateway`]: ties them together around an injected executor.

pub mod gateway;
pub mod idempotency;
pub mod tools;

pub use gateway::MutationGateway;
pub use idempotency::{payload_hash, IdempotencyRecord, IdempotencyStore};
pub use tools::{MutationTool, MutationToolRegistry, MutationToolSpec};

// ── Tests ─────────────────────────────────────────────────────────────────────
