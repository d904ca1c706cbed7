//! Integration tests for the `sie-update` binary: argument parsing,
//! validation, and exit codes -- nothing here touches the network or
//! the host's interfaces.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the binary with env isolation, pointing the
/// config file at a nonexistent path so the host's real configuration
/// never leaks in.
fn sie_update_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sie-update");
    cmd.env("SIE_CONFIG", "/tmp/sie-update-test-nonexistent.toml")
        .env_remove("SIE_ETCDIR")
        .env_remove("SIE_BASE_URL")
        .env_remove("SIE_POLL_TIME")
        .env_remove("SIE_LOG_FILE");
    cmd
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn help_describes_the_flags() {
    sie_update_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("--interface")
            .and(predicate::str::contains("--etcdir"))
            .and(predicate::str::contains("--preserve"))
            .and(predicate::str::contains("--daemon")),
    );
}

#[test]
fn version_flag_names_the_tool() {
    sie_update_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sie-update"));
}

// ── Validation ──────────────────────────────────────────────────────

#[test]
fn missing_interface_exits_with_usage_code() {
    let etc = tempfile::tempdir().unwrap();
    sie_update_cmd()
        .args(["-e", etc.path().to_str().unwrap()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("interface"));
}

#[test]
fn nonexistent_etcdir_exits_with_usage_code() {
    sie_update_cmd()
        .args(["-i", "eth1", "-e", "/definitely/not/here"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("path does not exist"));
}

#[test]
fn invalid_preserve_spec_exits_with_usage_code() {
    let etc = tempfile::tempdir().unwrap();
    sie_update_cmd()
        .args(["-i", "eth1", "-e", etc.path().to_str().unwrap(), "-P", "ten"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("preserve"));
}
