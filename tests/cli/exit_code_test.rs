//! Exit status and error output of the binary for failures that happen
//! before any server is reached.

use std::path::Path;
use std::process::{Command, Output};

fn run(dir: &Path, args: &[&str]) -> Output {
    let config = dir.join("double-check.toml");
    Command::new(env!("CARGO_BIN_EXE_double-check"))
        .current_dir(dir)
        .env_remove("DATABEND_DSN_V1")
        .env_remove("DATABEND_DSN_V2")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(&config)
        .args(args)
        .output()
        .expect("failed to run double-check")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_missing_dsn_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &[]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Configuration Error"), "stderr: {err}");
    assert!(err.contains("DATABEND_DSN_V1"), "stderr: {err}");
}

#[test]
fn test_invalid_database_name() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["--database", "bad name;"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Configuration Error"));
}

#[test]
fn test_unparseable_dsn_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(
        dir.path(),
        &["--setup", "--dsn-v1", "not a dsn", "--dsn-v2", "not a dsn"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Connection Error"));
}

#[test]
fn test_malformed_config_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("double-check.toml"), "query_timeout_secs = \"soon\"").unwrap();

    let output = run(dir.path(), &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Configuration Error"));
}

#[test]
fn test_progress_goes_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &[]);

    let out = String::from_utf8_lossy(&output.stdout);
    assert!(out.starts_with("Starting script execution."));
    assert!(out.contains("Script execution completed."));
}
