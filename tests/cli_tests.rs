//! Integration tests for the conflag binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn conflag(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("conflag").expect("binary");
    cmd.env("HOME", home.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_defaults_without_user_config() {
    let home = TempDir::new().expect("tmp");
    conflag(&home)
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"workers\""))
        .stdout(predicate::str::contains("\"value\": \"4\""));
}

#[test]
fn test_user_config_is_applied() {
    let home = TempDir::new().expect("tmp");
    fs::write(home.path().join(".conflag"), "workers=8\ntag=a,b\n").expect("write");

    conflag(&home)
        .args(["--format=json", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"value\": \"8\""))
        .stdout(predicate::str::contains("\"value\": \"a,b\""))
        .stdout(predicate::str::contains("applied user config"));
}

#[test]
fn test_command_line_overrides_user_config() {
    let home = TempDir::new().expect("tmp");
    fs::write(home.path().join(".conflag"), "workers=8\n").expect("write");

    conflag(&home)
        .args(["--workers=16", "--format=json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"value\": \"16\""));
}

#[test]
fn test_show_paths() {
    let home = TempDir::new().expect("tmp");
    conflag(&home)
        .arg("--show-paths")
        .assert()
        .success()
        .stdout(predicate::str::contains("global config: /etc/conflag"))
        .stdout(predicate::str::contains(".conflag"));
}

#[test]
fn test_unreadable_user_config_exits_2() {
    let home = TempDir::new().expect("tmp");
    fs::create_dir_all(home.path().join(".conflag")).expect("dir");

    conflag(&home)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error parsing config file"));
}

#[test]
fn test_unknown_flag_in_config_exits_2() {
    let home = TempDir::new().expect("tmp");
    fs::write(home.path().join(".conflag"), "nosuch=1\n").expect("write");

    conflag(&home)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nosuch"));
}

#[test]
fn test_help_prints_usage() {
    let home = TempDir::new().expect("tmp");
    conflag(&home)
        .arg("--help")
        .assert()
        .success()
        .stderr(predicate::str::contains("Usage of"))
        .stderr(predicate::str::contains("--workers"));
}

#[test]
fn test_unknown_format_fails() {
    let home = TempDir::new().expect("tmp");
    conflag(&home)
        .arg("--format=xml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown output format"));
}
