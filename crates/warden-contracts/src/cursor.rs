//! Opaque pagination cursor.
//!
//! A cursor is the URL-safe base64 encoding of a small JSON object holding the
//! sort position of the last row a page returned. It never carries tenant,
//! actor, or request identifiers, and callers must treat it as opaque.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{WardenError, WardenResult};

/// Sort position of the last row on a page.
///
/// For timeline pages `sort_key` is the event timestamp and `secondary_key`
/// the event id; for agent pages they are the agent id and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Cursor {
    pub sort_key: String,
    pub secondary_key: String,
}

impl Cursor {
    pub fn new(sort_key: impl Into<String>, secondary_key: impl Into<String>) -> Self {
        Self {
            sort_key: sort_key.into(),
            secondary_key: secondary_key.into(),
        }
    }

    /// Encode into the opaque token handed to callers.
    pub fn encode(&self) -> String {
        let raw = serde_json::json!({
            "sortKey": self.sort_key,
            "secondaryKey": self.secondary_key,
        })
        .to_string();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    /// Decode a token previously produced by `encode`.
    pub fn decode(token: &str) -> WardenResult<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| WardenError::InvalidCursor {
                reason: "cursor is not valid base64".to_string(),
            })?;

        let cursor: Cursor =
            serde_json::from_slice(&bytes).map_err(|_| WardenError::InvalidCursor {
                reason: "cursor has an invalid structure".to_string(),
            })?;

        if cursor.sort_key.is_empty() {
            return Err(WardenError::InvalidCursor {
                reason: "cursor sort key is empty".to_string(),
            });
        }

        Ok(cursor)
    }

    /// True when the row at `(sort_key, secondary_key)` sorts strictly after
    /// this cursor.
    pub fn precedes(&self, sort_key: &str, secondary_key: &str) -> bool {
        (sort_key, secondary_key) > (self.sort_key.as_str(), self.secondary_key.as_str())
    }
}
