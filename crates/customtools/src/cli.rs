//! Command line definition and CLI errors.

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::tracing::{LogLevel, TracingFormat};

/// Successful exit code
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;

/// CLI-specific errors
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Invalid command line input
    #[error("CLI error: {message}")]
    #[diagnostic(code(customtools::cli::usage))]
    Usage {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// Error from tool resolution or configuration
    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] customtools_core::Error),
}

impl CliError {
    /// Create a usage error with help text
    #[must_use]
    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Top-level arguments
#[derive(Parser, Debug)]
#[command(name = "customtools")]
#[command(about = "Run build steps with custom tools on PATH")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file
    #[arg(
        short = 'c',
        long,
        global = true,
        env = "CUSTOMTOOLS_CONFIG",
        default_value = "customtools.toml"
    )]
    pub config: PathBuf,

    /// Logging level
    #[arg(
        short = 'l',
        long,
        global = true,
        env = "CUSTOMTOOLS_LOG",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format
    #[arg(long, global = true, default_value = "compact", value_enum)]
    pub log_format: TracingFormat,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the environment the selected tools produce
    Env {
        /// Tool selection and node description
        #[command(flatten)]
        selection: SelectionArgs,

        /// Output format
        #[arg(long, default_value = "shell", value_enum)]
        format: EnvFormat,
    },
    /// Run a command with the selected tools installed and on PATH
    Exec {
        /// Tool selection and node description
        #[command(flatten)]
        selection: SelectionArgs,

        /// Command and its arguments
        #[arg(last = true, required = true, num_args = 1..)]
        command: Vec<String>,
    },
    /// List configured tools
    Tools {
        /// Output format
        #[arg(long, default_value = "text", value_enum)]
        format: ListFormat,
    },
}

/// Which tools to use and on what node
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Tool to use; repeat to select several, in order
    #[arg(short = 't', long = "tool", value_name = "NAME")]
    pub tools: Vec<String>,

    /// Extra label for this node
    #[arg(long = "label", value_name = "LABEL")]
    pub labels: Vec<String>,

    /// Node name; also matched as a label
    #[arg(long, env = "CUSTOMTOOLS_NODE_NAME")]
    pub node_name: Option<String>,

    /// Job-level variable, applied after every tool
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,
}

/// Output formats for `env`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvFormat {
    /// `export` lines for a POSIX shell
    Shell,
    /// The mutation as JSON
    Json,
}

/// Output formats for `tools`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// One tool per line
    Text,
    /// Tool definitions as JSON
    Json,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse the process arguments
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
