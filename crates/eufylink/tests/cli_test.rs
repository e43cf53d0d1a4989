//! Integration tests for the `eufylink` CLI binary.
//!
//! These tests validate argument parsing, help output, configuration
//! handling and connection errors, all without a live event server.
#![allow(clippy::unwrap_used)]

use std::net::TcpListener;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `eufylink` binary with env isolation.
///
/// Clears all `EUFYLINK_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn eufylink_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("eufylink");
    cmd.env("HOME", "/tmp/eufylink-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/eufylink-cli-test-nonexistent")
        .env_remove("EUFYLINK_CONFIG")
        .env_remove("EUFYLINK_HOST")
        .env_remove("EUFYLINK_PORT")
        .env_remove("EUFYLINK_UPDATE_INTERVAL")
        .env_remove("EUFYLINK_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

/// A local port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = eufylink_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    eufylink_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("snapshot")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("properties"))
            .and(predicate::str::contains("rtsp")),
    );
}

#[test]
fn test_version_flag() {
    eufylink_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("eufylink"));
}

#[test]
fn test_completions_bash() {
    eufylink_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_invalid_output_format_rejected() {
    eufylink_cmd()
        .args(["--output", "csv", "snapshot"])
        .assert()
        .code(2);
}

#[test]
fn test_properties_requires_serial() {
    eufylink_cmd().arg("properties").assert().code(2);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");

    eufylink_cmd()
        .args(["config", "path", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    eufylink_cmd()
        .args(["config", "init", "--port", "3100", "--config"])
        .arg(&path)
        .assert()
        .success();
    assert!(std::fs::read_to_string(&path).unwrap().contains("3100"));

    eufylink_cmd()
        .args(["config", "show", "-o", "json", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"port\": 3100")
                .and(predicate::str::contains("\"host\": \"127.0.0.1\"")),
        );
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = 3000\n").unwrap();

    eufylink_cmd()
        .args(["config", "init", "--config"])
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));

    eufylink_cmd()
        .args(["config", "init", "--force", "--config"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_env_overrides_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = 3000\nupdate_interval = 30\n").unwrap();

    eufylink_cmd()
        .env("EUFYLINK_UPDATE_INTERVAL", "5")
        .args(["config", "show", "-o", "json-compact", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"update_interval\":5"));
}

#[test]
fn test_invalid_event_rule_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[[events]]\nevent = \"rings\"\nvalue_field = \"\"\ntarget = \"cached\"\n",
    )
    .unwrap();

    eufylink_cmd()
        .args(["snapshot", "--config"])
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("events"));
}

// ── Connection errors ───────────────────────────────────────────────

#[test]
fn test_snapshot_without_server_is_connection_error() {
    let port = closed_port();

    let output = eufylink_cmd()
        .args(["snapshot", "--port", &port.to_string()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(7), "Expected exit code 7");
    let text = combined_output(&output);
    assert!(
        text.contains("Could not connect"),
        "Expected connection error in output:\n{text}"
    );
}

#[test]
fn test_rtsp_without_server_is_connection_error() {
    let port = closed_port();

    eufylink_cmd()
        .args(["rtsp", "T8400", "--off", "--port", &port.to_string()])
        .assert()
        .code(7);
}
