//! Environment management for customtools
//!
//! This module holds the process environment a build step runs with, the
//! composer that turns resolved tools into an [`EnvironmentMutation`], and the
//! scoped wrapper that applies a mutation around a step sequence.

mod composer;
mod mutation;
mod scope;

pub use composer::compose;
pub use mutation::{EnvironmentMutation, PATH_VAR, apply_mutation, path_prepend_target};
pub use scope::{BuildEnvironment, EnvironmentScope};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::variables::VariableLookup;

/// Environment variables visible to a build step and its sub-processes
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Environment {
    /// Map of environment variable names to values
    #[serde(flatten)]
    pub vars: BTreeMap<String, String>,
}

impl Environment {
    /// Create a new empty environment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    #[must_use]
    pub fn from_system() -> Self {
        Self {
            vars: env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Get an environment variable value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set an environment variable
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Remove an environment variable, returning its old value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }

    /// Check if an environment variable exists
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Get the number of environment variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Check if the environment is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over environment variables
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    /// Entries of this environment's PATH, in lookup order
    ///
    /// Empty segments (the current directory) are kept so PATH survives a
    /// rebuild unchanged; an unset or empty PATH has no entries.
    #[must_use]
    pub fn path_entries(&self) -> Vec<PathBuf> {
        self.get(PATH_VAR)
            .filter(|p| !p.is_empty())
            .map(|p| env::split_paths(p).collect())
            .unwrap_or_default()
    }

    /// Replace PATH with the given entries
    pub fn set_path_entries(&mut self, entries: &[PathBuf]) {
        match env::join_paths(entries) {
            Ok(joined) => {
                self.set(PATH_VAR, os_to_string(joined));
            }
            Err(e) => {
                // An entry contains the separator; keep the entries that can be joined
                tracing::warn!(error = %e, "PATH entry contains the path separator, dropping it");
                let usable: Vec<&PathBuf> = entries
                    .iter()
                    .filter(|p| env::join_paths([p.as_os_str()]).is_ok())
                    .collect();
                if let Ok(joined) = env::join_paths(usable) {
                    self.set(PATH_VAR, os_to_string(joined));
                }
            }
        }
    }

    /// Look `command` up in this environment's PATH.
    ///
    /// Spawning searches the parent's PATH, not the child's, so a wrapped
    /// step has to resolve its program here. Falls back to `command` itself
    /// so the spawn reports the failure.
    #[must_use]
    pub fn resolve_command(&self, command: &str) -> String {
        if Path::new(command).is_absolute() || command.contains(std::path::MAIN_SEPARATOR) {
            return command.to_string();
        }

        let found = self
            .path_entries()
            .into_iter()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.join(command))
            .find(|candidate| is_executable(candidate));
        match found {
            Some(path) => {
                tracing::debug!(%command, resolved = %path.display(), "Resolved command");
                path.to_string_lossy().into_owned()
            }
            None => {
                tracing::debug!(%command, "Command not on wrapped PATH");
                command.to_string()
            }
        }
    }
}

impl VariableLookup for Environment {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

fn os_to_string(value: OsString) -> String {
    value.to_string_lossy().into_owned()
}

fn is_executable(candidate: &Path) -> bool {
    if !candidate.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(candidate)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        true
    }
}
