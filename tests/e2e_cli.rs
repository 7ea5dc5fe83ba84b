//! CLI end-to-end tests
//!
//! Tests for the cinestream command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the cinestream binary
#[allow(deprecated)]
fn cinestream_cmd() -> Command {
    Command::cargo_bin("cinestream").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = cinestream_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = cinestream_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cinestream"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = cinestream_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cinestream"));
}

#[test]
fn test_cli_validate_valid_config() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
[server]
host = "127.0.0.1"
port = 9000

[session]
secret = "a-real-secret"

[streaming]
range_mode = "lenient"
"#,
    )
    .unwrap();

    let mut cmd = cinestream_cmd();
    cmd.env_remove("PORT")
        .env_remove("SESSION_SECRET")
        .arg("validate")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("127.0.0.1:9000"))
        .stdout(predicate::str::contains("Lenient"));
}

#[test]
fn test_cli_validate_rejects_zero_chunk_size() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[streaming]\nchunk_size = 0\n").unwrap();

    let mut cmd = cinestream_cmd();
    cmd.arg("validate")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk_size"));
}

#[test]
fn test_cli_validate_invalid_toml() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("bad.toml");
    fs::write(&config_path, "[server\nport = ").unwrap();

    let mut cmd = cinestream_cmd();
    cmd.arg("validate").arg(&config_path).assert().failure();
}

#[test]
fn test_cli_hash_password() {
    let mut cmd = cinestream_cmd();
    cmd.arg("hash-password")
        .arg("hunter2")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("$2"));
}

#[test]
fn test_cli_generate_secret() {
    let mut cmd = cinestream_cmd();
    cmd.arg("generate-secret")
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]{64}\n$").unwrap());
}
