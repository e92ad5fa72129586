//! End-to-end tests for the customtools binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CONFIG: &str = r#"
[[tools]]
name = "MyTrue"
home = "/tools/true"
exported_paths = "bin"

[[tools]]
name = "jdk"
home = "/opt/jdk"

[[tools.label_specifics]]
label = "arm"
additional_vars = "JAVA_OPTS=-Xmx512m"

[[global]]
additional_vars = "FOO=bar"
"#;

fn workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("customtools.toml"), CONFIG).unwrap();
    temp_dir
}

fn customtools(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("customtools").unwrap();
    cmd.current_dir(dir.path()).env_remove("CUSTOMTOOLS_CONFIG");
    cmd
}

#[test]
fn test_tools_lists_configuration() {
    let dir = workspace();
    customtools(&dir)
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("MyTrue\t/tools/true"))
        .stdout(predicate::str::contains("jdk\t/opt/jdk"));
}

#[test]
fn test_env_prints_exports() {
    let dir = workspace();
    customtools(&dir)
        .args(["env", "--tool", "MyTrue"])
        .assert()
        .success()
        .stdout(predicate::str::contains("export MyTrue_HOME='/tools/true'"))
        .stdout(predicate::str::contains("export FOO='bar'"))
        .stdout(predicate::str::contains("export PATH='/tools/true/bin'"));
}

#[test]
fn test_env_label_and_vars() {
    let dir = workspace();
    customtools(&dir)
        .args([
            "env", "--tool", "jdk", "--label", "arm", "--var", "FOO=job", "--format", "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"JAVA_OPTS\": \"-Xmx512m\""))
        .stdout(predicate::str::contains("\"FOO\": \"job\""));
}

#[test]
fn test_unknown_tool_fails() {
    let dir = workspace();
    customtools(&dir)
        .args(["env", "--tool", "Deleted"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Deleted"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = workspace();
    customtools(&dir)
        .args(["tools", "--config", "nope.toml"])
        .assert()
        .failure();
}

#[cfg(unix)]
#[test]
fn test_exec_runs_inside_environment() {
    let dir = workspace();
    customtools(&dir)
        .args(["exec", "--tool", "MyTrue", "--", "sh", "-c"])
        .arg("case \"$PATH\" in /tools/true/bin:*) echo \"$FOO\";; *) exit 9;; esac")
        .assert()
        .success()
        .stdout(predicate::str::contains("bar"));
}

#[cfg(unix)]
#[test]
fn test_exec_propagates_exit_code() {
    let dir = workspace();
    customtools(&dir)
        .args(["exec", "--", "sh", "-c", "exit 5"])
        .assert()
        .code(5);
}
