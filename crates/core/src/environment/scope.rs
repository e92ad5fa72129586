//! Scoped application of an [`EnvironmentMutation`] around a step sequence.
//!
//! [`BuildEnvironment::wrap`] applies a mutation and hands back a guard; the
//! prior environment comes back when the guard is dropped, whether the steps
//! returned normally, bailed out with `?`, or panicked. Guards nest: a wrapper
//! inside another wrapper restores to the outer wrapper's state.

use std::ops::{Deref, DerefMut};
use tokio::process::Command;

use super::{Environment, EnvironmentMutation, apply_mutation};

/// The environment a build's steps run with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnvironment {
    current: Environment,
}

impl BuildEnvironment {
    /// Start from the given environment
    #[must_use]
    pub fn new(initial: Environment) -> Self {
        Self { current: initial }
    }

    /// Start from the current process environment
    #[must_use]
    pub fn from_system() -> Self {
        Self::new(Environment::from_system())
    }

    /// The environment steps currently observe
    #[must_use]
    pub fn current(&self) -> &Environment {
        &self.current
    }

    /// Apply `mutation` until the returned scope is dropped.
    pub fn wrap(&mut self, mutation: &EnvironmentMutation) -> EnvironmentScope<'_> {
        let saved = self.current.clone();
        self.current = apply_mutation(mutation, &saved);
        tracing::debug!(
            assignments = mutation.len(),
            path_entries = mutation.path_prepend().len(),
            "Applied environment mutation"
        );
        EnvironmentScope {
            build: self,
            saved: Some(saved),
        }
    }

    /// A command that runs `program` with exactly this environment.
    ///
    /// The program is looked up in this environment's PATH, not the parent's.
    #[must_use]
    pub fn command(&self, program: &str) -> Command {
        let mut cmd = Command::new(self.current.resolve_command(program));
        cmd.env_clear().envs(&self.current.vars);
        cmd
    }
}

/// Guard returned by [`BuildEnvironment::wrap`]; restores on drop.
#[derive(Debug)]
pub struct EnvironmentScope<'a> {
    build: &'a mut BuildEnvironment,
    saved: Option<Environment>,
}

impl EnvironmentScope<'_> {
    /// Restore the prior environment now instead of at end of scope.
    pub fn unwrap_scope(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.build.current = saved;
            tracing::debug!("Restored environment");
        }
    }
}

impl Deref for EnvironmentScope<'_> {
    type Target = BuildEnvironment;

    fn deref(&self) -> &Self::Target {
        &*self.build
    }
}

impl DerefMut for EnvironmentScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.build
    }
}

impl Drop for EnvironmentScope<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}
