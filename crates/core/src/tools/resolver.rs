//! Turns the tools selected for a build into [`ResolvedTool`]s for one node.

use indexmap::IndexMap;
use tracing::debug;

use super::{CustomTool, InstallerRegistry, ResolvedTool, SelectedTool, ToolOptions, ToolRegistry};
use crate::labels::{LabelMatcher, LabelSpecifics, select_applicable};
use crate::node::NodeContext;
use crate::paths::{resolve_exported_paths, resolve_home};
use crate::variables::{Layered, expand, parse_variables};
use crate::{Error, Result};

/// Resolve `selected` on `node`, in order.
///
/// Every name is looked up before any installer runs, so an unknown tool
/// fails the build without side effects.
///
/// # Errors
///
/// [`Error::UnknownTool`] for the first missing name,
/// [`Error::ToolResolution`] when a home cannot be resolved.
pub async fn resolve(
    selected: &[SelectedTool],
    registry: &ToolRegistry,
    node: &dyn NodeContext,
    installers: &InstallerRegistry,
    matcher: &dyn LabelMatcher,
    options: &ToolOptions,
) -> Result<Vec<ResolvedTool>> {
    let tools = selected
        .iter()
        .map(|s| {
            registry
                .get_tool_by_name(&s.name)
                .ok_or_else(|| Error::unknown_tool(&s.name))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut resolved = Vec::with_capacity(tools.len());
    for tool in tools {
        resolved.push(resolve_one(tool, node, installers, matcher, options).await?);
    }
    Ok(resolved)
}

async fn resolve_one(
    tool: &CustomTool,
    node: &dyn NodeContext,
    installers: &InstallerRegistry,
    matcher: &dyn LabelMatcher,
    options: &ToolOptions,
) -> Result<ResolvedTool> {
    let home = resolve_home(tool, node, installers, options).await?;

    let mut variables = vec![(
        tool.home_variable_name(options.convert_homes_to_uppercase),
        home.to_string_lossy().into_owned(),
    )];
    if let Some(block) = tool.additional_variables.as_deref() {
        variables.extend(parse_variables(block));
    }

    // Tool env: node environment overlaid with the tool's own variables
    let mut own: IndexMap<String, String> = IndexMap::new();
    for (key, value) in &variables {
        let value = expand(value, &Layered::new(&own, node.environment()));
        own.insert(key.clone(), value);
    }
    let tool_env = Layered::new(&own, node.environment());

    let label_specifics = LabelSpecifics::substitute_all(
        &select_applicable(Some(tool.label_specifics.as_slice()), node, matcher),
        &tool_env,
    );

    let mut exported_paths =
        resolve_exported_paths(&expand(tool.exported_paths_or_default(), &tool_env), &home);
    for specifics in &label_specifics {
        if let Some(block) = specifics.exported_paths() {
            exported_paths.extend(resolve_exported_paths(block, &home));
        }
    }

    debug!(
        tool = %tool.name,
        home = %home.display(),
        variables = variables.len(),
        overrides = label_specifics.len(),
        paths = exported_paths.len(),
        "Resolved tool"
    );

    Ok(ResolvedTool {
        name: tool.name.clone(),
        home,
        variables,
        label_specifics,
        exported_paths,
    })
}
