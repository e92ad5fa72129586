//! Custom tool definitions, installers and per-build resolution.
//!
//! # Architecture
//!
//! - [`CustomTool`] - A configured tool: home template, exported paths,
//!   additional variables, label overrides, optional installer
//! - [`ToolRegistry`] - Tools indexed by name
//! - [`SelectedTool`] - A per-build reference to a tool; order matters
//! - [`Installer`] - Capability that materializes a tool on a node, selected
//!   through [`InstallerSource`] and an [`InstallerRegistry`]
//! - [`ResolvedTool`] - A tool made concrete for one node and one build
//! - [`InstallLock`] - Serializes installs of one tool across builds
//!
//! # Example
//!
//! ```ignore
//! use customtools_core::tools::{CustomTool, SelectedTool, ToolRegistry};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(CustomTool::new("jdk").with_home("/opt/jdk"));
//!
//! let resolved = resolve(&[SelectedTool::new("jdk")], &registry, &node, &installers, &matcher, &options).await?;
//! ```

mod builtin;
mod installer;
mod lock;
mod registry;
mod resolver;

pub use builtin::{CommandInstaller, LocalInstaller};
pub use installer::{
    InstallRequest, Installer, InstallerRegistry, InstallerSource, ToolOptions,
    default_tools_root,
};
pub use lock::InstallLock;
pub use registry::ToolRegistry;
pub use resolver::resolve;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::labels::LabelSpecifics;

/// Exported path used when a tool does not configure any.
pub const DEFAULT_EXPORTED_PATH: &str = "bin";

/// A configured custom tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTool {
    /// Unique name within a registry
    pub name: String,
    /// Home directory template; may reference node variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    /// Comma or newline separated paths, relative to home unless absolute.
    /// Absent means [`DEFAULT_EXPORTED_PATH`]; blank means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_paths: Option<String>,
    /// `KEY=value` lines contributed by the tool itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_variables: Option<String>,
    /// Node-specific overrides
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_specifics: Vec<LabelSpecifics>,
    /// How to install the tool when no home is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer: Option<InstallerSource>,
}

impl CustomTool {
    /// Tool with only a name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            home: None,
            exported_paths: None,
            additional_variables: None,
            label_specifics: Vec::new(),
            installer: None,
        }
    }

    /// Set the home template
    #[must_use]
    pub fn with_home(mut self, home: impl Into<String>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Set the exported paths block
    #[must_use]
    pub fn with_exported_paths(mut self, paths: impl Into<String>) -> Self {
        self.exported_paths = Some(paths.into());
        self
    }

    /// Set the additional variables block
    #[must_use]
    pub fn with_additional_variables(mut self, vars: impl Into<String>) -> Self {
        self.additional_variables = Some(vars.into());
        self
    }

    /// Append a label override
    #[must_use]
    pub fn with_label_specifics(mut self, specifics: LabelSpecifics) -> Self {
        self.label_specifics.push(specifics);
        self
    }

    /// Set the installer
    #[must_use]
    pub fn with_installer(mut self, installer: InstallerSource) -> Self {
        self.installer = Some(installer);
        self
    }

    /// Exported paths block, falling back to [`DEFAULT_EXPORTED_PATH`]
    #[must_use]
    pub fn exported_paths_or_default(&self) -> &str {
        self.exported_paths
            .as_deref()
            .unwrap_or(DEFAULT_EXPORTED_PATH)
    }

    /// Name of the variable that carries the tool's home, e.g. `jdk-17` ->
    /// `jdk_17_HOME` (or `JDK_17_HOME` when `uppercase`).
    #[must_use]
    pub fn home_variable_name(&self, uppercase: bool) -> String {
        let mut base = sanitize_name(&self.name);
        if uppercase {
            base = base.to_uppercase();
        }
        format!("{base}_HOME")
    }
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Reference to a tool selected for a build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedTool {
    /// Registry name of the tool
    pub name: String,
}

impl SelectedTool {
    /// Select a tool by name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<&str> for SelectedTool {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A tool made concrete for one node; immutable and build-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTool {
    /// Tool name
    pub name: String,
    /// Absolute home directory on the node
    pub home: PathBuf,
    /// Variables the tool declares, home variable first
    pub variables: Vec<(String, String)>,
    /// Applicable overrides, already substituted
    pub label_specifics: Vec<LabelSpecifics>,
    /// PATH entries: the tool's own, then those of its overrides
    pub exported_paths: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_variable_name() {
        let tool = CustomTool::new("my-tool.v2");
        assert_eq!(tool.home_variable_name(false), "my_tool_v2_HOME");
        assert_eq!(tool.home_variable_name(true), "MY_TOOL_V2_HOME");
    }

    #[test]
    fn test_exported_paths_default() {
        assert_eq!(CustomTool::new("t").exported_paths_or_default(), "bin");
        assert_eq!(
            CustomTool::new("t")
                .with_exported_paths("")
                .exported_paths_or_default(),
            ""
        );
    }

    #[test]
    fn test_tool_deserialization() {
        let json = r#"{
            "name": "MyTrue",
            "home": "/tools/true",
            "label_specifics": [{"label": "linux", "additional_vars": "A=1"}],
            "installer": {"type": "command", "command": "touch ok"}
        }"#;
        let tool: CustomTool = serde_json::from_str(json).unwrap();
        assert_eq!(tool.name, "MyTrue");
        assert_eq!(tool.home.as_deref(), Some("/tools/true"));
        assert_eq!(tool.label_specifics.len(), 1);
        assert!(matches!(
            tool.installer,
            Some(InstallerSource::Command { ref command, home: None }) if command == "touch ok"
        ));
    }

    #[test]
    fn test_selected_tool_is_transparent() {
        let selected: Vec<SelectedTool> = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(selected, vec![SelectedTool::new("a"), SelectedTool::from("b")]);
    }
}
