//! The fixed allow-list of mutation tools.
//!
//! Each `(tool_name, version)` pair carries a JSON Schema for its parameters,
//! compiled once when the registry is built. A bad schema is a configuration
//! error at construction, never a runtime surprise.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use warden_contracts::{
    error::{WardenError, WardenResult},
    governance::ReasonCode,
};

/// Declaration of one mutation tool version.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MutationToolSpec {
    pub tool_name: String,
    pub version: String,
    /// JSON Schema for the command's `parameters`.
    pub parameters_schema: Value,
}

pub struct MutationTool {
    spec: MutationToolSpec,
    validator: jsonschema::Validator,
}

impl MutationTool {
    pub fn spec(&self) -> &MutationToolSpec {
        &self.spec
    }

    /// Every schema violation in `parameters`, as human-readable messages.
    pub fn validate_parameters(&self, parameters: &Value) -> Vec<String> {
        self.validator
            .iter_errors(parameters)
            .map(|error| format!("parameter violation at {}: {}", error.instance_path, error))
            .collect()
    }
}

/// Immutable `(tool, version)` → tool map.
pub struct MutationToolRegistry {
    tools: BTreeMap<String, BTreeMap<String, MutationTool>>,
}

impl MutationToolRegistry {
    pub fn new(specs: Vec<MutationToolSpec>) -> WardenResult<Self> {
        let mut tools: BTreeMap<String, BTreeMap<String, MutationTool>> = BTreeMap::new();

        for spec in specs {
            if spec.tool_name.trim().is_empty() || spec.version.trim().is_empty() {
                return Err(WardenError::RegistryViolation {
                    reason: "mutation tool name and version must not be empty".to_string(),
                });
            }
            let validator = jsonschema::validator_for(&spec.parameters_schema).map_err(|e| {
                WardenError::ConfigError {
                    reason: format!(
                        "invalid parameter schema for '{}@{}': {e}",
                        spec.tool_name, spec.version
                    ),
                }
            })?;

            let versions = tools.entry(spec.tool_name.clone()).or_default();
            if versions.contains_key(&spec.version) {
                return Err(WardenError::RegistryViolation {
                    reason: format!(
                        "mutation tool '{}@{}' is registered more than once",
                        spec.tool_name, spec.version
                    ),
                });
            }
            versions.insert(spec.version.clone(), MutationTool { spec, validator });
        }

        Ok(Self { tools })
    }

    /// Look up a tool version, failing closed.
    pub fn resolve(&self, tool_name: &str, version: &str) -> Result<&MutationTool, ReasonCode> {
        let versions = self.tools.get(tool_name).ok_or(ReasonCode::UnknownTool)?;
        versions.get(version).ok_or(ReasonCode::UnknownVersion)
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }
}
