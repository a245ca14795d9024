//! Tool-name allow-list for the timeline.
//!
//! Tool names arrive from raw telemetry and may contain anything a caller
//! typed. Only names in the allow-list reach the timeline. Everything else is
//! replaced with [`UNKNOWN_TOOL`].

use std::collections::BTreeSet;

use warden_policy::AgentRegistry;

pub const UNKNOWN_TOOL: &str = "unknown_tool";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolAllowlist {
    tools: BTreeSet<String>,
}

impl ToolAllowlist {
    pub fn new<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tools: tools.into_iter().map(Into::into).collect(),
        }
    }

    /// Every tool the registry maps to a scope.
    pub fn from_registry(registry: &AgentRegistry) -> Self {
        Self::new(registry.tools().keys().cloned())
    }

    pub fn contains(&self, tool_name: &str) -> bool {
        self.tools.contains(tool_name)
    }

    pub fn sanitize(&self, tool_name: &str) -> String {
        if self.contains(tool_name) {
            tool_name.to_string()
        } else {
            UNKNOWN_TOOL.to_string()
        }
    }
}
