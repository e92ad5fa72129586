//! Per-build preparation: selected tools in, environment mutation out.

use std::sync::Arc;

use crate::Result;
use crate::environment::{EnvironmentMutation, compose};
use crate::labels::{LabelExpressionMatcher, LabelMatcher, LabelSpecifics, select_applicable};
use crate::node::NodeContext;
use crate::tools::{InstallerRegistry, SelectedTool, ToolOptions, ToolRegistry, resolve};

/// Everything needed to prepare a build's tool environment.
///
/// Holds no per-build state; one instance can serve many builds.
pub struct ToolEnvironment {
    registry: ToolRegistry,
    installers: InstallerRegistry,
    matcher: Arc<dyn LabelMatcher>,
    options: ToolOptions,
}

impl ToolEnvironment {
    /// Environment backed by `registry`, the built-in installers, label
    /// expression matching and default options.
    #[must_use]
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            installers: InstallerRegistry::with_builtin(),
            matcher: Arc::new(LabelExpressionMatcher),
            options: ToolOptions::default(),
        }
    }

    /// Replace the installer registry
    #[must_use]
    pub fn with_installers(mut self, installers: InstallerRegistry) -> Self {
        self.installers = installers;
        self
    }

    /// Replace the label matcher
    #[must_use]
    pub fn with_matcher(mut self, matcher: Arc<dyn LabelMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Replace the options
    #[must_use]
    pub fn with_options(mut self, options: ToolOptions) -> Self {
        self.options = options;
        self
    }

    /// Configured tools
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Registered installers
    #[must_use]
    pub fn installers(&self) -> &InstallerRegistry {
        &self.installers
    }

    /// Resolve `selected` on `node` and compose the mutation to wrap the
    /// build's steps with.
    ///
    /// `global_overrides` are filtered to those applying to `node` and
    /// expanded against its environment before composition.
    ///
    /// # Errors
    ///
    /// Fails on an unknown tool or a home that cannot be resolved. Nothing
    /// has been applied to any environment when this returns an error.
    pub async fn prepare_environment(
        &self,
        selected: &[SelectedTool],
        global_overrides: &[LabelSpecifics],
        node: &dyn NodeContext,
    ) -> Result<EnvironmentMutation> {
        tracing::debug!(
            node = node.name(),
            tools = selected.len(),
            "Preparing tool environment"
        );

        let globals = LabelSpecifics::substitute_all(
            &select_applicable(Some(global_overrides), node, self.matcher.as_ref()),
            node.environment(),
        );
        let resolved = resolve(
            selected,
            &self.registry,
            node,
            &self.installers,
            self.matcher.as_ref(),
            &self.options,
        )
        .await?;

        Ok(compose(&resolved, &globals, node.environment()))
    }
}

impl std::fmt::Debug for ToolEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEnvironment")
            .field("tools", &self.registry.names())
            .field("installers", &self.installers)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
