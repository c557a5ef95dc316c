//
//  bitbucket-cloud-cli
//  tests/cli.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Binary-level tests for the `bb` command.
//!
//! Every test points `BB_CONFIG_DIR` at a temporary directory and clears the
//! token variables, so nothing touches the user's real configuration.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn bb(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bb").unwrap();
    cmd.env("BB_CONFIG_DIR", config_dir.path())
        .env("BB_NO_PROMPT", "1")
        .env_remove("BB_TOKEN")
        .env_remove("BITBUCKET_TOKEN")
        .env_remove("BB_OAUTH_CLIENT_ID")
        .env_remove("BB_OAUTH_CLIENT_SECRET")
        .env_remove("BB_DEBUG");
    cmd
}

#[test]
fn version_prints_package_version() {
    let dir = TempDir::new().unwrap();
    bb(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "bb version {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    bb(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("snippet"))
        .stdout(predicate::str::contains("--hostname"));
}

#[test]
fn config_path_uses_config_dir() {
    let dir = TempDir::new().unwrap();
    let expected = dir.path().join("config.toml");
    bb(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.display().to_string()));
}

#[test]
fn config_set_then_get() {
    let dir = TempDir::new().unwrap();
    bb(&dir)
        .args(["config", "set", "http_timeout", "45"])
        .assert()
        .success();
    bb(&dir)
        .args(["config", "get", "http_timeout"])
        .assert()
        .success()
        .stdout("45\n");
}

#[test]
fn config_rejects_unknown_key() {
    let dir = TempDir::new().unwrap();
    bb(&dir)
        .args(["config", "set", "editor", "vim"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn git_protocol_requires_known_host() {
    let dir = TempDir::new().unwrap();
    bb(&dir)
        .args(["config", "set", "git_protocol", "https"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a known host"));
}

#[test]
fn status_without_login() {
    let dir = TempDir::new().unwrap();
    bb(&dir)
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in to any Bitbucket hosts"));
}

#[test]
fn logout_without_login_is_a_notice() {
    let dir = TempDir::new().unwrap();
    bb(&dir)
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in to bitbucket.org"));
}

#[test]
fn oauth_login_needs_client_configuration() {
    let dir = TempDir::new().unwrap();
    bb(&dir)
        .args(["auth", "login"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("BB_OAUTH_CLIENT_ID"))
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn login_with_empty_token_fails() {
    let dir = TempDir::new().unwrap();
    bb(&dir)
        .args(["auth", "login", "--with-token"])
        .write_stdin("\n")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("No token provided"));
    assert!(!dir.path().join("hosts.yml").exists());
}

#[test]
fn email_requires_with_token() {
    let dir = TempDir::new().unwrap();
    bb(&dir)
        .args(["auth", "login", "--email", "me@example.com"])
        .assert()
        .failure();
}

#[test]
fn completion_generates_script() {
    let dir = TempDir::new().unwrap();
    bb(&dir)
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_bb"));
}
