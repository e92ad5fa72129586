//! Composition of resolved tools and job-level overrides into one mutation.

use tracing::debug;

use super::{Environment, EnvironmentMutation, path_prepend_target};
use crate::labels::LabelSpecifics;
use crate::paths::split_exported_paths;
use crate::tools::ResolvedTool;
use crate::variables::{Layered, expand, references};

/// Build the mutation for `resolved` tools plus `global_overrides`.
///
/// PATH entries come from each tool in order, then from the global
/// overrides. Assignments are layered, later layers winning: tool variables,
/// then each tool's label overrides, then the global overrides. Values are
/// expanded against `base_env` overlaid with the assignments made so far.
///
/// `global_overrides` must already be filtered to the node and substituted.
#[must_use]
pub fn compose(
    resolved: &[ResolvedTool],
    global_overrides: &[LabelSpecifics],
    base_env: &Environment,
) -> EnvironmentMutation {
    let mut mutation = EnvironmentMutation::new();

    for tool in resolved {
        for entry in &tool.exported_paths {
            mutation.prepend_path(entry.clone());
        }
    }
    for global in global_overrides {
        for entry in global.exported_paths().map(split_exported_paths).unwrap_or_default() {
            let entry = std::path::Path::new(entry);
            if entry.is_absolute() {
                mutation.prepend_path(entry);
            } else {
                debug!(entry = %entry.display(), "Skipping relative job-level path");
            }
        }
    }

    for tool in resolved {
        for (key, value) in &tool.variables {
            assign(&mut mutation, key, value, base_env);
        }
    }
    for tool in resolved {
        for specifics in &tool.label_specifics {
            for (key, value) in specifics.variables() {
                assign(&mut mutation, &key, &value, base_env);
            }
        }
    }
    for global in global_overrides {
        for (key, value) in global.variables() {
            assign(&mut mutation, &key, &value, base_env);
        }
    }

    debug!(
        tools = resolved.len(),
        assignments = mutation.len(),
        path_entries = mutation.path_prepend().len(),
        "Composed environment"
    );
    mutation
}

fn assign(mutation: &mut EnvironmentMutation, key: &str, value: &str, base_env: &Environment) {
    let value = expand(value, &Layered::new(&*mutation, base_env));
    let unresolved = references(&value);
    if !unresolved.is_empty() {
        debug!(%key, ?unresolved, "Keeping unresolved references verbatim");
    }
    if path_prepend_target(key).is_some() {
        mutation.prepend_path(value);
    } else {
        mutation.assign(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tool(name: &str, vars: &[(&str, &str)], specifics: &[&str], paths: &[&str]) -> ResolvedTool {
        ResolvedTool {
            name: name.to_string(),
            home: PathBuf::from(format!("/tools/{name}")),
            variables: vars
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            label_specifics: specifics
                .iter()
                .map(|vars| LabelSpecifics::everywhere(Some((*vars).to_string()), None))
                .collect(),
            exported_paths: paths.iter().map(PathBuf::from).collect(),
        }
    }

    fn global(vars: Option<&str>, paths: Option<&str>) -> LabelSpecifics {
        LabelSpecifics::everywhere(vars.map(String::from), paths.map(String::from))
    }

    #[test]
    fn test_path_order_tools_then_globals() {
        let resolved = [
            tool("a", &[], &[], &["/tools/a/bin"]),
            tool("b", &[], &[], &["/tools/b/bin", "/tools/a/bin"]),
        ];
        let globals = [global(None, Some("/opt/extra/bin, relative/bin"))];

        let m = compose(&resolved, &globals, &Environment::new());
        assert_eq!(
            m.path_prepend(),
            &[
                PathBuf::from("/tools/a/bin"),
                PathBuf::from("/tools/b/bin"),
                PathBuf::from("/opt/extra/bin"),
            ]
        );
    }

    #[test]
    fn test_global_overrides_beat_tool_variables() {
        let resolved = [tool("a", &[("a_HOME", "/tools/a"), ("MODE", "tool")], &[], &[])];
        let globals = [global(Some("MODE=job"), None)];

        let m = compose(&resolved, &globals, &Environment::new());
        assert_eq!(m.get("MODE"), Some("job"));
        assert_eq!(m.get("a_HOME"), Some("/tools/a"));
    }

    #[test]
    fn test_later_tool_wins_and_job_level_wins_over_both() {
        let resolved = [
            tool("a", &[("V", "a")], &[], &["/tools/a/bin"]),
            tool("b", &[("V", "b")], &[], &["/tools/b/bin"]),
        ];

        let m = compose(&resolved, &[], &Environment::new());
        assert_eq!(m.get("V"), Some("b"));
        assert_eq!(
            m.path_prepend(),
            &[PathBuf::from("/tools/a/bin"), PathBuf::from("/tools/b/bin")]
        );

        let m = compose(&resolved, &[global(Some("V=job"), None)], &Environment::new());
        assert_eq!(m.get("V"), Some("job"));
    }

    #[test]
    fn test_label_overrides_beat_any_tool_variable() {
        // Tool B's override beats tool A's base variable and vice versa
        let resolved = [
            tool("a", &[("SHARED", "a-base")], &["OTHER=a-label"], &[]),
            tool("b", &[("OTHER", "b-base")], &["SHARED=b-label"], &[]),
        ];
        let m = compose(&resolved, &[], &Environment::new());
        assert_eq!(m.get("SHARED"), Some("b-label"));
        assert_eq!(m.get("OTHER"), Some("a-label"));
    }

    #[test]
    fn test_values_expand_against_earlier_assignments_and_base() {
        let mut base = Environment::new();
        base.set("USER_DIR", "/home/u");
        let resolved = [tool("jdk", &[("jdk_HOME", "/tools/jdk")], &[], &[])];
        let globals = [global(
            Some("JAVA_HOME=${jdk_HOME}\nCACHE=$USER_DIR/.cache\nLATER=${NOT_YET}\nNOT_YET=x"),
            None,
        )];

        let m = compose(&resolved, &globals, &base);
        assert_eq!(m.get("JAVA_HOME"), Some("/tools/jdk"));
        assert_eq!(m.get("CACHE"), Some("/home/u/.cache"));
        // Single forward pass
        assert_eq!(m.get("LATER"), Some("${NOT_YET}"));
    }

    #[test]
    fn test_path_plus_keys_become_prepends() {
        let resolved = [tool("a", &[("PATH+EXTRA", "/extra/bin")], &[], &["/tools/a/bin"])];
        let m = compose(&resolved, &[], &Environment::new());
        assert_eq!(m.get("PATH+EXTRA"), None);
        assert_eq!(
            m.path_prepend(),
            &[PathBuf::from("/tools/a/bin"), PathBuf::from("/extra/bin")]
        );
    }

    #[test]
    fn test_empty_tools_list_keeps_globals() {
        let globals = [global(Some("FOO=bar"), None)];
        let m = compose(&[], &globals, &Environment::new());
        assert_eq!(m.get("FOO"), Some("bar"));
        assert!(m.path_prepend().is_empty());
    }
}
