//! Error types for the WARDEN control plane.
//!
//! Governance denials and operator rejections are values, not errors. The
//! variants here cover caller input that cannot be interpreted, broken
//! configuration, collaborator failures, and the idempotency collision.

use thiserror::Error;

/// The unified error type for WARDEN crates.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Caller input failed schema validation.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// A pagination cursor could not be decoded.
    #[error("invalid cursor: {reason}")]
    InvalidCursor { reason: String },

    /// A required configuration value is missing or malformed.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A code-defined registry failed its construction-time checks.
    #[error("registry violation: {reason}")]
    RegistryViolation { reason: String },

    /// The same idempotency key was replayed with a different payload.
    ///
    /// This is a caller-side correctness bug and is never retried.
    #[error("idempotency key replayed with a different payload (stored hash {stored_hash}, received {received_hash})")]
    IdempotencyCollision {
        stored_hash: String,
        received_hash: String,
    },

    /// The idempotency store could not be read or written.
    #[error("idempotency store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// The audit sink could not persist a record.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// The timeline reader failed.
    #[error("timeline reader failed: {reason}")]
    ReaderFailed { reason: String },

    /// The mutation executor failed.
    #[error("mutation executor failed: {reason}")]
    ExecutorFailed { reason: String },

    /// A telemetry, signal, or metrics sink rejected a record.
    #[error("sink failed: {reason}")]
    SinkFailed { reason: String },
}

/// Convenience alias used throughout the WARDEN crates.
pub type WardenResult<T> = Result<T, WardenError>;
