//! Tool registry.
//!
//! Holds the configured custom tools in declaration order and looks them up
//! by name.

use indexmap::IndexMap;

use super::CustomTool;
use crate::{Error, Result};

/// Registry of configured tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    /// Tools indexed by name.
    tools: IndexMap<String, CustomTool>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first duplicate.
    pub fn from_tools(tools: impl IntoIterator<Item = CustomTool>) -> Result<Self> {
        let mut registry = Self::new();
        for tool in tools {
            if registry.tools.contains_key(&tool.name) {
                return Err(Error::configuration_with_help(
                    format!("Tool '{}' is defined more than once", tool.name),
                    "Tool names must be unique",
                ));
            }
            registry.register(tool);
        }
        Ok(registry)
    }

    /// Register a tool.
    ///
    /// If a tool with the same name already exists, it will be replaced.
    pub fn register(&mut self, tool: CustomTool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Remove a tool by name.
    pub fn remove(&mut self, name: &str) -> Option<CustomTool> {
        self.tools.shift_remove(name)
    }

    /// Get a tool by name.
    #[must_use]
    pub fn get_tool_by_name(&self, name: &str) -> Option<&CustomTool> {
        self.tools.get(name)
    }

    /// Iterate over all tools in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CustomTool> {
        self.tools.values()
    }

    /// Get the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get all tool names.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}
