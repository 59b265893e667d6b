//! End-to-end CLI tests for the tunefetch binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn tunefetch() -> Command {
    let mut cmd = Command::cargo_bin("tunefetch").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("TUNEFETCH_ACCESS_TOKEN")
        .env_remove("TUNEFETCH_CONTENT_FEEDER_COMMAND");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    tunefetch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--liked-songs"))
        .stdout(predicate::str::contains("search"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    tunefetch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tunefetch"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    tunefetch()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_search_without_term_fails() {
    tunefetch().arg("search").assert().failure();
}

#[test]
fn test_binary_web_flag_reports_not_implemented() {
    tunefetch()
        .arg("--web")
        .assert()
        .success()
        .stdout(predicate::str::contains("not implemented"));
}

#[test]
fn test_binary_missing_token_fails() {
    tunefetch()
        .arg("spotify:track:4uLU6hMCjMI75M1A2tKUQC")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TUNEFETCH_ACCESS_TOKEN"));
}

#[test]
fn test_binary_invalid_configuration_fails() {
    tunefetch()
        .env("TUNEFETCH_CHUNK_SIZE_BYTES", "0")
        .arg("spotify:track:4uLU6hMCjMI75M1A2tKUQC")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn test_binary_missing_feeder_command_fails() {
    tunefetch()
        .env("TUNEFETCH_ACCESS_TOKEN", "token")
        .arg("spotify:track:4uLU6hMCjMI75M1A2tKUQC")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TUNEFETCH_CONTENT_FEEDER_COMMAND"));
}
