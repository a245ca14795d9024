//! Canonical JSON serialization and SHA-256 helpers.
//!
//! Object keys are sorted recursively before serialization so the same
//! logical value always hashes to the same digest, regardless of how the map
//! was built.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{WardenError, WardenResult};

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Return a copy of `value` with every object's keys in ascending order.
pub fn canonicalize_json_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Array(values) => {
            serde_json::Value::Array(values.iter().map(canonicalize_json_value).collect())
        }
        serde_json::Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in entries {
                out.insert(k.clone(), canonicalize_json_value(v));
            }
            serde_json::Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Canonical JSON text of `value`.
pub fn canonical_json_string(value: &serde_json::Value) -> String {
    canonicalize_json_value(value).to_string()
}

/// SHA-256 over the canonical JSON text of `value`.
pub fn hash_canonical_json(value: &serde_json::Value) -> String {
    sha256_hex(canonical_json_string(value).as_bytes())
}

/// Serialize `value` and hash its canonical form.
pub fn hash_serializable<T: Serialize>(value: &T) -> WardenResult<String> {
    let json = serde_json::to_value(value).map_err(|e| WardenError::Validation {
        reason: format!("value is not representable as JSON: {e}"),
    })?;
    Ok(hash_canonical_json(&json))
}
