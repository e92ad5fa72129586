//! The execution node a build runs on.
//!
//! Resolution never reaches for a global node registry; every call receives
//! the node explicitly as a [`NodeContext`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::environment::Environment;

/// Read-only view of the node a build is resolved for.
pub trait NodeContext: Send + Sync {
    /// Node name; also acts as an implicit label
    fn name(&self) -> &str;

    /// Labels assigned to the node
    fn labels(&self) -> &BTreeSet<String>;

    /// Base environment used for variable substitution
    fn environment(&self) -> &Environment;

    /// Whether the node carries `label`, counting its own name.
    fn has_label(&self, label: &str) -> bool {
        self.name() == label || self.labels().contains(label)
    }
}

/// A plain node description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Node name
    pub name: String,
    /// Assigned labels
    #[serde(default)]
    pub labels: BTreeSet<String>,
    /// Node environment
    #[serde(default, skip_serializing_if = "Environment::is_empty")]
    pub environment: Environment,
}

impl Node {
    /// Node with no labels and an empty environment
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add labels
    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    /// Replace the environment
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

impl NodeContext for Node {
    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    fn environment(&self) -> &Environment {
        &self.environment
    }
}
