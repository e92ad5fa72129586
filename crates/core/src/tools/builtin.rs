//! Built-in installers: a node-local directory and a shell command.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use super::installer::{InstallRequest, Installer, InstallerSource};
use crate::paths::resolve_exported_path;
use crate::variables::expand;
use crate::{Error, Result};

/// Uses a directory that already exists on the node.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalInstaller;

#[async_trait]
impl Installer for LocalInstaller {
    fn name(&self) -> &str {
        "local"
    }

    fn description(&self) -> &'static str {
        "Use a directory already present on the node"
    }

    fn can_handle(&self, source: &InstallerSource) -> bool {
        matches!(source, InstallerSource::Local { .. })
    }

    async fn install_on(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let InstallerSource::Local { home } = request.source else {
            return Err(Error::installation(
                "LocalInstaller received non-local source",
            ));
        };

        let home = expand(home, request.node.environment());
        if home.trim().is_empty() {
            return Err(Error::installation_with_help(
                format!("Local installer for '{}' has no home", request.tool.name),
                "Set `home` on the local installer",
            ));
        }

        let home = PathBuf::from(home.trim());
        if !home.exists() {
            debug!(tool = %request.tool.name, home = %home.display(), "Local home does not exist on this node");
        }
        Ok(home)
    }
}

/// Runs a shell command inside the tool's install directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandInstaller;

impl CommandInstaller {
    fn shell(command: &str) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        }
        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("/bin/sh");
            cmd.args(["-c", command]);
            cmd
        }
    }

    async fn run(command: &str, dir: &Path, request: &InstallRequest<'_>) -> Result<()> {
        let output = Self::shell(command)
            .current_dir(dir)
            .envs(&request.node.environment().vars)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::io(e, dir, "spawn installer command"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::installation_with_help(
                format!(
                    "Command for '{}' exited with {}: {}",
                    request.tool.name,
                    output.status,
                    stderr.trim()
                ),
                format!("Run the command manually in {}", dir.display()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Installer for CommandInstaller {
    fn name(&self) -> &str {
        "command"
    }

    fn description(&self) -> &'static str {
        "Run a shell command in the tool's install directory"
    }

    fn can_handle(&self, source: &InstallerSource) -> bool {
        matches!(source, InstallerSource::Command { .. })
    }

    async fn install_on(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let InstallerSource::Command { command, home } = request.source else {
            return Err(Error::installation(
                "CommandInstaller received non-command source",
            ));
        };

        let dir = request.install_dir();
        let _lock = request.lock().await?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::io(e, &dir, "create install directory"))?;

        debug!(tool = %request.tool.name, dir = %dir.display(), "Running installer command");
        Self::run(command, &dir, request).await?;

        let home = match home {
            Some(home) => {
                let home = expand(home, request.node.environment());
                resolve_exported_path(&home, &dir).unwrap_or_else(|| dir.clone())
            }
            None => dir,
        };
        info!(tool = %request.tool.name, home = %home.display(), "Installed tool");
        Ok(home)
    }
}
