//! `customtools tools`: list configured tools.

use customtools_core::CustomTool;

use crate::cli::{CliError, ListFormat};

/// Render the configured tools in `format`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(tools: &[CustomTool], format: ListFormat) -> Result<String, CliError> {
    match format {
        ListFormat::Text => Ok(tools.iter().map(describe).collect()),
        ListFormat::Json => serde_json::to_string_pretty(tools).map_err(|e| {
            CliError::usage_with_help(
                format!("Failed to serialize tools: {e}"),
                "Use --format text",
            )
        }),
    }
}

fn describe(tool: &CustomTool) -> String {
    let source = match (&tool.home, &tool.installer) {
        (Some(home), _) if !home.trim().is_empty() => home.clone(),
        (_, Some(installer)) => format!("<{}>", installer.provider_type()),
        _ => "<no home>".to_string(),
    };
    format!("{}\t{}\n", tool.name, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use customtools_core::tools::InstallerSource;

    #[test]
    fn test_render_text() {
        let tools = [
            CustomTool::new("MyTrue").with_home("/tools/true"),
            CustomTool::new("sdk").with_installer(InstallerSource::Command {
                command: "true".into(),
                home: None,
            }),
            CustomTool::new("bare"),
        ];
        assert_eq!(
            render(&tools, ListFormat::Text).unwrap(),
            "MyTrue\t/tools/true\nsdk\t<command>\nbare\t<no home>\n"
        );
    }

    #[test]
    fn test_render_json() {
        let tools = [CustomTool::new("MyTrue").with_home("/tools/true")];
        let json = render(&tools, ListFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "MyTrue");
        assert_eq!(value[0]["home"], "/tools/true");
    }
}
