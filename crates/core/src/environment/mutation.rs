//! The resolved output of environment composition and its pure application.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::Environment;
use crate::variables::VariableLookup;

/// Name of the executable search path variable.
pub const PATH_VAR: &str = "PATH";

/// Target variable of a `NAME+SUFFIX` prepend key, if `key` has that shape.
///
/// Only `PATH` prepends are recognised; any other `+` key is an ordinary name.
#[must_use]
pub fn path_prepend_target(key: &str) -> Option<&str> {
    match key.split_once('+') {
        Some((PATH_VAR, suffix)) if !suffix.is_empty() => Some(PATH_VAR),
        _ => None,
    }
}

/// Ordered variable assignments plus PATH entries to prepend.
///
/// Each variable name appears once; assigning a name again replaces its value
/// in place. PATH entries keep the position of their first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentMutation {
    assignments: IndexMap<String, String>,
    path_prepend: Vec<PathBuf>,
}

impl EnvironmentMutation {
    /// Empty mutation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `value` to `name`, replacing any earlier assignment
    pub fn assign(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.assignments.insert(name.into(), value.into());
    }

    /// Append a PATH entry unless it is already listed
    pub fn prepend_path(&mut self, entry: impl Into<PathBuf>) {
        let entry = entry.into();
        if entry.as_os_str().is_empty() || self.path_prepend.contains(&entry) {
            return;
        }
        self.path_prepend.push(entry);
    }

    /// Assignments in application order
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &str)> {
        self.assignments
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Value assigned to `name`, if any
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.assignments.get(name).map(String::as_str)
    }

    /// PATH entries to prepend, highest precedence first
    #[must_use]
    pub fn path_prepend(&self) -> &[PathBuf] {
        &self.path_prepend
    }

    /// Whether `entry` is one of the PATH prepends
    #[must_use]
    pub fn prepends(&self, entry: &Path) -> bool {
        self.path_prepend.iter().any(|p| p == entry)
    }

    /// Number of variable assignments
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// True when the mutation changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty() && self.path_prepend.is_empty()
    }
}

impl VariableLookup for EnvironmentMutation {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

/// Merge `mutation` into a copy of `base`.
///
/// Assignments are set first, then PATH becomes the prepend entries followed
/// by the remaining entries of the (possibly reassigned) PATH with the
/// prepended ones removed. Applying the result again yields the same map.
#[must_use]
pub fn apply_mutation(mutation: &EnvironmentMutation, base: &Environment) -> Environment {
    let mut merged = base.clone();
    for (name, value) in mutation.assignments() {
        merged.set(name, value);
    }

    if !mutation.path_prepend.is_empty() {
        let mut entries = mutation.path_prepend.clone();
        entries.extend(
            merged
                .path_entries()
                .into_iter()
                .filter(|e| !mutation.prepends(e)),
        );
        merged.set_path_entries(&entries);
    }

    merged
}
