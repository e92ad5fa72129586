//! Per-tool install lock shared by every build on a node.
//!
//! Builds that install the same tool at the same time serialize on
//! `<tools_root>/.<tool>.lock`; the second one in finds the finished
//! installation instead of racing the first.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ToolOptions, sanitize_name};
use crate::{Error, Result};

/// Exclusive file lock held while a tool is installed; released on drop.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

impl InstallLock {
    /// Lock file guarding `tool_name` under the configured tools root.
    #[must_use]
    pub fn path_for(options: &ToolOptions, tool_name: &str) -> PathBuf {
        options
            .tools_root()
            .join(format!(".{}.lock", sanitize_name(tool_name)))
    }

    /// Wait for the lock on `tool_name`.
    ///
    /// Waiting happens on the blocking pool so other builds in the same
    /// runtime keep making progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or locked.
    pub async fn acquire(options: &ToolOptions, tool_name: &str) -> Result<Self> {
        let path = Self::path_for(options, tool_name);
        tokio::task::spawn_blocking(move || Self::acquire_blocking(path))
            .await
            .map_err(|e| Error::installation(format!("Install lock task failed: {e}")))?
    }

    fn acquire_blocking(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create"))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io(e, &path, "open"))?;

        // Blocks until no other build holds the lock
        FileExt::lock_exclusive(&file).map_err(|e| Error::io(e, &path, "lock"))?;
        debug!(lock = %path.display(), "Acquired install lock");
        Ok(Self { file, path })
    }

    /// Path of the lock file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(lock = %self.path.display(), error = %e, "Failed to release install lock");
        }
    }
}
