//! Integration tests for the `latchkey` CLI binary.
//!
//! These tests validate argument parsing, help output, config handling,
//! and error exit codes — all without requiring a live lock cloud.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `latchkey` binary with env isolation.
///
/// Clears all `LATCHKEY_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn latchkey_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("latchkey");
    cmd.env("HOME", "/tmp/latchkey-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/latchkey-cli-test-nonexistent")
        .env_remove("LATCHKEY_CONFIG")
        .env_remove("LATCHKEY_URL")
        .env_remove("LATCHKEY_IDENTIFIER")
        .env_remove("LATCHKEY_PASSWORD")
        .env_remove("LATCHKEY_API_KEY")
        .env_remove("LATCHKEY_OUTPUT")
        .env_remove("LATCHKEY_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = latchkey_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    latchkey_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("smart lock")
            .or(predicate::str::contains("smart-lock"))
            .and(predicate::str::contains("run"))
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("lock"))
            .and(predicate::str::contains("unlock")),
    );
}

#[test]
fn test_version_flag() {
    latchkey_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("latchkey"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = latchkey_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_status_without_credentials() {
    let output = latchkey_cmd().arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(3), "Expected auth exit code");
    let text = combined_output(&output);
    assert!(
        text.contains("credentials") || text.contains("identifier"),
        "Expected missing-credentials error:\n{text}"
    );
}

#[test]
fn test_lock_requires_lock_id() {
    let output = latchkey_cmd().arg("lock").output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected usage exit code");
}

#[test]
fn test_invalid_output_format() {
    let output = latchkey_cmd()
        .args(["--output", "invalid", "status"])
        .output()
        .unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid output format"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid")
            || text.contains("possible values")
            || text.contains("valid value"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_global_flags_parsing() {
    // All flags should parse correctly — the failure should be about
    // missing credentials, not about argument parsing.
    let output = latchkey_cmd()
        .args(["--output", "json", "--verbose", "--timeout", "60", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3), "Expected auth exit code");
}

// ── Config subcommands ──────────────────────────────────────────────

#[test]
fn test_config_path_prints_a_path() {
    latchkey_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_without_file_renders_defaults() {
    latchkey_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("short_interval_secs = 5")
                .and(predicate::str::contains("long_interval_secs = 300")),
        );
}

#[test]
fn test_config_init_writes_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    latchkey_cmd()
        .args(["--config", path.to_str().unwrap(), "config", "init"])
        .assert()
        .success();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("short_duration_secs = 120"));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "url = \"https://example.com\"\n").unwrap();

    latchkey_cmd()
        .args(["--config", path.to_str().unwrap(), "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_file_supplies_credentials_but_not_connectivity() {
    // With a full config pointing at an unroutable URL the failure
    // must come from the network, proving the file was read.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "url = \"http://127.0.0.1:1\"\n\
         identifier = \"me@example.com\"\n\
         password = \"secret\"\n\
         api_key = \"key\"\n",
    )
    .unwrap();

    let output = latchkey_cmd()
        .args(["--config", path.to_str().unwrap(), "status"])
        .output()
        .unwrap();
    assert_eq!(
        output.status.code(),
        Some(7),
        "Expected connection exit code:\n{}",
        combined_output(&output)
    );
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_verify_subcommands_exist() {
    latchkey_cmd()
        .args(["verify", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("send").and(predicate::str::contains("submit")));
}

#[test]
fn test_run_flags_exist() {
    latchkey_cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--short-interval")
                .and(predicate::str::contains("--long-interval"))
                .and(predicate::str::contains("--short-duration")),
        );
}
