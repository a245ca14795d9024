//! Operator API limits.

use serde::Deserialize;

use warden_contracts::error::{WardenError, WardenResult};

/// Page size bounds for the read endpoints.
///
/// ```toml
/// default_limit = 50
/// max_limit = 200
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OperatorConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 200,
        }
    }
}

impl OperatorConfig {
    pub fn from_toml_str(s: &str) -> WardenResult<Self> {
        let config: OperatorConfig = toml::from_str(s).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to parse operator config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WardenResult<()> {
        if self.max_limit == 0 || self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(WardenError::ConfigError {
                reason: format!(
                    "limits must satisfy 1 <= default_limit ({}) <= max_limit ({})",
                    self.default_limit, self.max_limit
                ),
            });
        }
        Ok(())
    }
}
