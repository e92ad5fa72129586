//! Tool home and exported path resolution.
//!
//! A tool's home is either configured explicitly (expanded against the node
//! environment) or produced by its installer. Exported paths are resolved
//! relative to that home unless absolute.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::node::NodeContext;
use crate::tools::{CustomTool, InstallRequest, InstallerRegistry, ToolOptions};
use crate::variables::expand;
use crate::{Error, Result};

/// Resolve the home directory of `tool` on `node`.
///
/// # Errors
///
/// Returns [`Error::ToolResolution`] naming the tool when it has neither a
/// home nor an installer, when no installer handles its source, or when the
/// installer fails.
pub async fn resolve_home(
    tool: &CustomTool,
    node: &dyn NodeContext,
    installers: &InstallerRegistry,
    options: &ToolOptions,
) -> Result<PathBuf> {
    if let Some(home) = tool.home.as_deref().filter(|h| !h.trim().is_empty()) {
        let home = expand(home.trim(), node.environment());
        debug!(tool = %tool.name, %home, "Using configured home");
        return Ok(PathBuf::from(home));
    }

    let source = tool.installer.as_ref().ok_or_else(|| {
        Error::tool_resolution(&tool.name, "no home directory or installer configured")
    })?;
    let installer = installers.find_for_source(source).ok_or_else(|| {
        Error::tool_resolution(
            &tool.name,
            format!("no installer registered for '{}'", source.provider_type()),
        )
    })?;

    installer
        .check_prerequisites()
        .await
        .map_err(|e| Error::tool_resolution(&tool.name, e))?;

    debug!(tool = %tool.name, installer = installer.name(), "Installing tool");
    let request = InstallRequest {
        tool,
        source,
        node,
        options,
    };
    installer
        .install_on(&request)
        .await
        .map_err(|e| Error::tool_resolution(&tool.name, e))
}

/// Resolve one exported path entry against `home`.
///
/// Blank entries yield `None`; absolute entries are returned unchanged.
#[must_use]
pub fn resolve_exported_path(path: &str, home: &Path) -> Option<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        Some(candidate.to_path_buf())
    } else {
        Some(home.join(candidate))
    }
}

/// Split an exported-paths block on commas and newlines.
///
/// Entries are trimmed; empty entries are dropped.
#[must_use]
pub fn split_exported_paths(text: &str) -> Vec<&str> {
    text.split([',', '\n'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split `text` and resolve every entry against `home`, keeping order.
#[must_use]
pub fn resolve_exported_paths(text: &str, home: &Path) -> Vec<PathBuf> {
    split_exported_paths(text)
        .into_iter()
        .filter_map(|p| resolve_exported_path(p, home))
        .collect()
}
