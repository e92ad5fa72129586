//! Installer capability for tools that have no preconfigured home.
//!
//! An [`InstallerSource`] describes where a tool comes from; the
//! [`InstallerRegistry`] picks the [`Installer`] able to handle it. Installers
//! are registered at startup, so new kinds can be added without touching the
//! resolver.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use super::{CustomTool, sanitize_name};
use crate::Result;
use crate::node::NodeContext;

/// Where and how a tool gets installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallerSource {
    /// Tool already present at a node-local directory.
    Local {
        /// Home directory template
        home: String,
    },
    /// Shell command run in the tool's install directory.
    Command {
        /// Command line passed to the shell
        command: String,
        /// Home relative to the install directory, or absolute
        #[serde(default, skip_serializing_if = "Option::is_none")]
        home: Option<String>,
    },
    /// Archive (zip or tar.gz) fetched from a URL and unpacked.
    DownloadAndUnpack {
        /// Archive URL
        url: String,
        /// Directory inside the archive that becomes the home
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subdir: Option<String>,
    },
    /// Installer registered by id with free-form configuration.
    Custom {
        /// Registered installer name
        id: String,
        /// Installer-specific configuration
        #[serde(default)]
        config: serde_json::Value,
    },
}

impl InstallerSource {
    /// Name of the installer kind, matching [`Installer::name`] for built-ins.
    #[must_use]
    pub fn provider_type(&self) -> &str {
        match self {
            Self::Local { .. } => "local",
            Self::Command { .. } => "command",
            Self::DownloadAndUnpack { .. } => "download_and_unpack",
            Self::Custom { id, .. } => id,
        }
    }
}

/// Options for installation and resolution.
#[derive(Debug, Clone, Default)]
pub struct ToolOptions {
    /// Root under which installers place tools
    pub tools_root: Option<PathBuf>,
    /// Reinstall even when a previous installation is present
    pub force_reinstall: bool,
    /// Uppercase the `<TOOL>_HOME` variable name
    pub convert_homes_to_uppercase: bool,
}

impl ToolOptions {
    /// Create new options with the default tools root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tools root.
    #[must_use]
    pub fn with_tools_root(mut self, path: PathBuf) -> Self {
        self.tools_root = Some(path);
        self
    }

    /// Set force reinstall.
    #[must_use]
    pub fn with_force_reinstall(mut self, force: bool) -> Self {
        self.force_reinstall = force;
        self
    }

    /// Set home variable uppercasing.
    #[must_use]
    pub fn with_uppercase_homes(mut self, uppercase: bool) -> Self {
        self.convert_homes_to_uppercase = uppercase;
        self
    }

    /// Get the tools root, defaulting to ~/.cache/customtools/tools.
    #[must_use]
    pub fn tools_root(&self) -> PathBuf {
        self.tools_root.clone().unwrap_or_else(default_tools_root)
    }

    /// Install directory for `tool_name` under the tools root.
    #[must_use]
    pub fn tool_dir(&self, tool_name: &str) -> PathBuf {
        self.tools_root().join(sanitize_name(tool_name))
    }
}

/// Get the default root directory for installed tools.
#[must_use]
pub fn default_tools_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("customtools")
        .join("tools")
}

/// Request parameters for one installation.
pub struct InstallRequest<'a> {
    /// Tool being installed
    pub tool: &'a CustomTool,
    /// Source selected for it
    pub source: &'a InstallerSource,
    /// Node the build runs on
    pub node: &'a dyn NodeContext,
    /// Installation options
    pub options: &'a ToolOptions,
}

impl InstallRequest<'_> {
    /// Directory this tool installs into.
    #[must_use]
    pub fn install_dir(&self) -> PathBuf {
        self.options.tool_dir(&self.tool.name)
    }

    /// Wait for exclusive access to this tool's install directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or locked.
    pub async fn lock(&self) -> Result<super::InstallLock> {
        super::InstallLock::acquire(self.options, &self.tool.name).await
    }
}

/// Trait for installers (local, command, archive download).
///
/// # Example
///
/// ```ignore
/// pub struct ArchiveInstaller { /* ... */ }
///
/// #[async_trait]
/// impl Installer for ArchiveInstaller {
///     fn name(&self) -> &str { "download_and_unpack" }
///     fn description(&self) -> &'static str { "Download and unpack an archive" }
///     // ...
/// }
/// ```
#[async_trait]
pub trait Installer: Send + Sync {
    /// Installer name; matches [`InstallerSource::provider_type`].
    fn name(&self) -> &str;

    /// Human-readable description for help text.
    fn description(&self) -> &'static str;

    /// Check if this installer can handle the given source.
    fn can_handle(&self, source: &InstallerSource) -> bool;

    /// Make the tool available on the node and return its home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be installed.
    async fn install_on(&self, request: &InstallRequest<'_>) -> Result<PathBuf>;

    /// Check if installer prerequisites are available.
    ///
    /// # Errors
    ///
    /// Returns an error with a helpful message if prerequisites are not met.
    async fn check_prerequisites(&self) -> Result<()> {
        Ok(())
    }
}

/// Registry of installers, kept in registration order.
#[derive(Default)]
pub struct InstallerRegistry {
    installers: IndexMap<String, Arc<dyn Installer>>,
}

impl InstallerRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the local and command installers.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(super::LocalInstaller);
        registry.register(super::CommandInstaller);
        registry
    }

    /// Register an installer, replacing one with the same name.
    pub fn register<I: Installer + 'static>(&mut self, installer: I) {
        self.register_arc(Arc::new(installer));
    }

    /// Register an installer wrapped in Arc.
    pub fn register_arc(&mut self, installer: Arc<dyn Installer>) {
        let name = installer.name().to_string();
        self.installers.insert(name, installer);
    }

    /// Get an installer by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Installer>> {
        self.installers.get(name)
    }

    /// Find the installer for `source`.
    ///
    /// Custom sources go by id; the others go to the first registered
    /// installer that accepts them.
    #[must_use]
    pub fn find_for_source(&self, source: &InstallerSource) -> Option<&Arc<dyn Installer>> {
        match source {
            InstallerSource::Custom { id, .. } => self.get(id),
            _ => self.installers.values().find(|i| i.can_handle(source)),
        }
    }

    /// Get the number of registered installers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.installers.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.installers.is_empty()
    }

    /// Get all installer names.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.installers.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for InstallerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallerRegistry")
            .field("installers", &self.names())
            .finish()
    }
}
