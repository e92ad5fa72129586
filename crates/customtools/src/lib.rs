//! customtools - run build steps with custom tools on PATH
//!
//! Reads tool definitions from a TOML file, resolves the selected tools on the
//! local node, and either prints the resulting environment or runs a command
//! inside it.

// CLI needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

/// CLI argument parsing and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Tracing and logging configuration.
pub mod tracing;

use cli::{Cli, CliError, Commands, EXIT_OK};
use customtools_core::Environment;

/// Execute the parsed command line; returns the process exit code.
///
/// # Errors
///
/// Returns an error when configuration, resolution or spawning fails.
pub async fn run(cli: Cli) -> Result<i32, CliError> {
    match cli.command {
        Commands::Env { selection, format } => {
            let mutation = commands::prepare(&cli.config, &selection).await?;
            print!("{}", commands::env::render(&mutation, format)?);
            Ok(EXIT_OK)
        }
        Commands::Exec { selection, command } => {
            let mutation = commands::prepare(&cli.config, &selection).await?;
            commands::exec::execute_exec(&mutation, Environment::from_system(), &command).await
        }
        Commands::Tools { format } => {
            let config = commands::load_config(&cli.config)?;
            print!("{}", commands::tools::render(&config.tools, format)?);
            Ok(EXIT_OK)
        }
    }
}
