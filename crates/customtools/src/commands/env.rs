//! `customtools env`: print the composed environment.

use customtools_core::EnvironmentMutation;
use tracing::warn;

use crate::cli::{CliError, EnvFormat};

#[cfg(windows)]
const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_SEPARATOR: &str = ":";

/// Render `mutation` in `format`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(mutation: &EnvironmentMutation, format: EnvFormat) -> Result<String, CliError> {
    match format {
        EnvFormat::Shell => Ok(render_shell(mutation)),
        EnvFormat::Json => serde_json::to_string_pretty(mutation).map_err(|e| {
            CliError::usage_with_help(
                format!("Failed to serialize environment: {e}"),
                "Use --format shell",
            )
        }),
    }
}

/// `export` lines that reproduce `mutation` in a POSIX shell.
///
/// PATH entries are prepended to the shell's own PATH at evaluation time.
#[must_use]
pub fn render_shell(mutation: &EnvironmentMutation) -> String {
    let mut out = String::new();
    for (name, value) in mutation.assignments() {
        if !is_shell_name(name) {
            warn!(%name, "Skipping variable that is not a valid shell name");
            continue;
        }
        out.push_str(&format!("export {name}={}\n", shell_quote(value)));
    }
    if !mutation.path_prepend().is_empty() {
        let entries = mutation
            .path_prepend()
            .iter()
            .map(|p| p.to_string_lossy())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR);
        out.push_str(&format!(
            "export PATH={}\"${{PATH:+{PATH_SEPARATOR}$PATH}}\"\n",
            shell_quote(&entries)
        ));
    }
    out
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_shell_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("$HOME"), "'$HOME'");
    }

    #[cfg(unix)]
    #[test]
    fn test_render_shell() {
        let mut m = EnvironmentMutation::new();
        m.assign("FOO", "bar");
        m.assign("MyTrue_HOME", "/tools/true");
        m.prepend_path("/tools/true/bin");
        m.prepend_path("/opt/x/bin");

        assert_eq!(
            render_shell(&m),
            "export FOO='bar'\n\
             export MyTrue_HOME='/tools/true'\n\
             export PATH='/tools/true/bin:/opt/x/bin'\"${PATH:+:$PATH}\"\n"
        );
    }

    #[test]
    fn test_is_shell_name() {
        assert!(is_shell_name("JAVA_HOME"));
        assert!(is_shell_name("_x1"));
        assert!(!is_shell_name("a-b"));
        assert!(!is_shell_name("1A"));
        assert!(!is_shell_name(""));
    }

    #[test]
    fn test_render_shell_skips_invalid_names() {
        let mut m = EnvironmentMutation::new();
        m.assign("a-b", "x");
        m.assign("GOOD", "y");
        assert_eq!(render_shell(&m), "export GOOD='y'\n");
    }

    #[test]
    fn test_render_shell_without_paths() {
        let mut m = EnvironmentMutation::new();
        m.assign("A", "1");
        assert_eq!(render_shell(&m), "export A='1'\n");
    }

    #[test]
    fn test_render_json() {
        let mut m = EnvironmentMutation::new();
        m.assign("FOO", "bar");
        let json = render(&m, EnvFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["assignments"]["FOO"], "bar");
    }
}
