use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Command with an isolated, empty config
fn twitch_tools(dir: &TempDir) -> Command {
    let config = dir.path().join("config.toml");
    let mut cmd = Command::cargo_bin("twitch-tools").unwrap();
    cmd.arg("--config")
        .arg(config)
        .env_remove("TW_CLIENT_ID")
        .env_remove("TW_TOKEN")
        .env_remove("TW_LOGIN")
        .env_remove("TWITCH_TOOLS_LOG_LEVEL")
        .env_remove("TWITCH_TOOLS_LOG_FORMAT");
    cmd
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("twitch-tools").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(concat!(
            "twitch-tools ",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("twitch-tools").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("follows"))
        .stdout(predicate::str::contains("bantool"));
}

#[test]
fn test_cli_follows_missing_user() {
    let mut cmd = Command::cargo_bin("twitch-tools").unwrap();
    cmd.args(["follows", "to"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "required arguments were not provided",
        ));
}

#[test]
fn test_cli_follows_invalid_origin() {
    let mut cmd = Command::cargo_bin("twitch-tools").unwrap();
    cmd.args(["follows", "sideways", "someone"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_cli_follows_without_credentials() {
    let dir = TempDir::new().unwrap();
    twitch_tools(&dir)
        .args(["follows", "to", "someone"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing Helix credential"));
}

#[test]
fn test_cli_bantool_without_login() {
    let dir = TempDir::new().unwrap();
    twitch_tools(&dir)
        .args(["bantool", "somechannel", "--token", "abc"])
        .write_stdin("spammer\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Login not set"));
}

#[test]
fn test_cli_bantool_rejects_zero_limit() {
    let dir = TempDir::new().unwrap();
    twitch_tools(&dir)
        .args([
            "bantool",
            "somechannel",
            "--login",
            "bot",
            "--token",
            "abc",
            "-l",
            "0",
        ])
        .write_stdin("spammer\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid rate limit"));
}

#[test]
fn test_cli_bantool_empty_input_is_noop() {
    let dir = TempDir::new().unwrap();
    twitch_tools(&dir)
        .args(["bantool", "somechannel", "--login", "bot", "--token", "abc"])
        .write_stdin(" \n,,\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_cli_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[logging]\nlevel = \"loud\"\n",
    )
    .unwrap();

    twitch_tools(&dir)
        .args(["info", "someone"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}
