//! Configuration file for custom tools.
//!
//! ```toml
//! [options]
//! convert_homes_to_uppercase = true
//!
//! [[tools]]
//! name = "MyTrue"
//! home = "/tools/true"
//! exported_paths = "bin"
//!
//! [[tools.label_specifics]]
//! label = "linux && x64"
//! additional_vars = "ARCH=x64"
//!
//! [[global]]
//! additional_vars = "FOO=bar"
//!
//! [node]
//! name = "agent-1"
//! labels = ["linux", "x64"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::labels::LabelSpecifics;
use crate::tools::{CustomTool, ToolOptions, ToolRegistry};
use crate::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Global options
    #[serde(default)]
    pub options: ConfigOptions,

    /// Configured tools, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<CustomTool>,

    /// Job-level overrides applied after every tool
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global: Vec<LabelSpecifics>,

    /// Description of the local node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeConfig>,
}

/// `[options]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOptions {
    /// Uppercase `<TOOL>_HOME` variable names
    #[serde(default)]
    pub convert_homes_to_uppercase: bool,

    /// Where installers place tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_root: Option<PathBuf>,
}

/// `[node]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Node name; defaults to the host name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Node labels
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

impl Config {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the TOML problem.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            Error::configuration_with_help(
                format!("Invalid configuration: {}", e.message()),
                "See the [options], [[tools]], [[global]] and [node] tables",
            )
        })
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a configuration
    /// error if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(e, path, "read"))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Self::from_toml_str(&text)
    }

    /// Registry of the configured tools.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a tool name is repeated or blank.
    pub fn registry(&self) -> Result<ToolRegistry> {
        if let Some(tool) = self.tools.iter().find(|t| t.name.trim().is_empty()) {
            return Err(Error::configuration(format!(
                "Tool with home {:?} has no name",
                tool.home
            )));
        }
        ToolRegistry::from_tools(self.tools.iter().cloned())
    }

    /// Resolution options derived from `[options]`.
    #[must_use]
    pub fn tool_options(&self) -> ToolOptions {
        let mut options =
            ToolOptions::new().with_uppercase_homes(self.options.convert_homes_to_uppercase);
        if let Some(root) = &self.options.tools_root {
            options = options.with_tools_root(root.clone());
        }
        options
    }
}
