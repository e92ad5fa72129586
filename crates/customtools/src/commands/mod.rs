//! Command implementations and the setup they share.

pub mod env;
pub mod exec;
pub mod tools;

use customtools_core::config::Config;
use customtools_core::tools::{InstallerRegistry, SelectedTool};
use customtools_core::{Environment, EnvironmentMutation, LabelSpecifics, Node, ToolEnvironment};
use customtools_installer_archive::ArchiveInstaller;
use std::path::Path;
use tracing::debug;

use crate::cli::{CliError, SelectionArgs};

/// Config file name used when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "customtools.toml";

/// Node name used when neither the CLI, the config nor `HOSTNAME` gives one.
pub const DEFAULT_NODE_NAME: &str = "local";

/// Load the configuration at `path`.
///
/// A missing default config file yields an empty configuration; any other
/// missing file is an error.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<Config, CliError> {
    if path == Path::new(DEFAULT_CONFIG_FILE) && !path.exists() {
        debug!(path = %path.display(), "No configuration file, using an empty one");
        return Ok(Config::default());
    }
    Ok(Config::load(path)?)
}

/// Describe the local node from the config, the CLI and the process
/// environment.
#[must_use]
pub fn build_node(config: &Config, selection: &SelectionArgs) -> Node {
    let configured = config.node.clone().unwrap_or_default();
    let name = selection
        .node_name
        .clone()
        .or(configured.name)
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty()))
        .unwrap_or_else(|| DEFAULT_NODE_NAME.to_string());

    Node::new(name)
        .with_labels(configured.labels)
        .with_labels(selection.labels.iter().cloned())
        .with_environment(Environment::from_system())
}

/// Configured global overrides followed by the `--var` job variables.
#[must_use]
pub fn global_overrides(config: &Config, selection: &SelectionArgs) -> Vec<LabelSpecifics> {
    let mut globals = config.global.clone();
    if !selection.vars.is_empty() {
        let block = selection
            .vars
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n");
        globals.push(LabelSpecifics::everywhere(Some(block), None));
    }
    globals
}

/// Tool environment with every installer this binary ships.
///
/// # Errors
///
/// Returns an error when the tool registry is invalid or the archive
/// installer cannot be created.
pub fn tool_environment(config: &Config) -> Result<ToolEnvironment, CliError> {
    let mut installers = InstallerRegistry::with_builtin();
    installers.register(ArchiveInstaller::new()?);

    Ok(ToolEnvironment::new(config.registry()?)
        .with_installers(installers)
        .with_options(config.tool_options()))
}

/// Load everything and prepare the mutation for `selection`.
///
/// # Errors
///
/// Returns an error on invalid configuration, an unknown tool or a failed
/// installation.
pub async fn prepare(
    config_path: &Path,
    selection: &SelectionArgs,
) -> Result<EnvironmentMutation, CliError> {
    let config = load_config(config_path)?;
    let node = build_node(&config, selection);
    let selected: Vec<SelectedTool> = selection
        .tools
        .iter()
        .map(|name| SelectedTool::new(name.as_str()))
        .collect();

    let mutation = tool_environment(&config)?
        .prepare_environment(&selected, &global_overrides(&config, selection), &node)
        .await?;
    Ok(mutation)
}
