//! `customtools exec`: run a command inside the tool environment.

use customtools_core::{BuildEnvironment, Environment, EnvironmentMutation, Error};
use tracing::{debug, info};

use crate::cli::CliError;

/// Exit code reported when the child produced none (killed by a signal on
/// platforms that do not expose it).
const EXIT_UNKNOWN: i32 = 1;

/// Run `command` with `mutation` applied on top of `base`; return its exit
/// code. The environment is restored before this returns.
///
/// # Errors
///
/// Returns an error if `command` is empty or cannot be spawned.
pub async fn execute_exec(
    mutation: &EnvironmentMutation,
    base: Environment,
    command: &[String],
) -> Result<i32, CliError> {
    let Some((program, args)) = command.split_first() else {
        return Err(CliError::usage_with_help(
            "No command given",
            "Pass the command after `--`, e.g. customtools exec -- make",
        ));
    };

    let mut build = BuildEnvironment::new(base);
    let scope = build.wrap(mutation);
    debug!(%program, args = args.len(), "Spawning command");

    let status = scope
        .command(program)
        .args(args)
        .status()
        .await
        .map_err(|e| Error::io(e, program, "spawn"))?;

    let code = exit_code(status);
    info!(%program, code, "Command finished");
    Ok(code)
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(EXIT_UNKNOWN)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(EXIT_UNKNOWN)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn base() -> Environment {
        let mut env = Environment::new();
        env.set("PATH", "/usr/bin:/bin");
        env
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_exec_sees_assignments() {
        let mut m = EnvironmentMutation::new();
        m.assign("FOO", "bar");

        let code = execute_exec(&m, base(), &args(&["sh", "-c", "test \"$FOO\" = bar"]))
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_exec_propagates_exit_code() {
        let code = execute_exec(
            &EnvironmentMutation::new(),
            base(),
            &args(&["sh", "-c", "exit 7"]),
        )
        .await
        .unwrap();
        assert_eq!(code, 7);
    }

    #[tokio::test]
    async fn test_exec_empty_command() {
        assert!(
            execute_exec(&EnvironmentMutation::new(), base(), &[])
                .await
                .is_err()
        );
    }
}
