//! Integration tests for the gitbatch binary.
//!
//! These tests run the CLI against real repositories built in a temp
//! directory. Every invocation points `--config` at an empty file so the
//! user's own configuration never leaks in.

mod common;

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

use common::{run_git, Workspace};

/// Get a command for running gitbatch with an isolated config.
fn gitbatch(ws: &Workspace) -> Command {
    let config = ws.root().join("config.toml");
    if !config.exists() {
        std::fs::write(&config, "").unwrap();
    }
    let mut cmd = Command::cargo_bin("gitbatch").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg(config);
    cmd
}

fn repos(ws: &Workspace) -> PathBuf {
    ws.root().join("repos")
}

fn break_remote(ws: &Workspace, repo: &Path) {
    let missing = ws.root().join("missing.git");
    run_git(repo, &["remote", "set-url", "origin", missing.to_str().unwrap()]);
}

#[test]
fn version_flag_works() {
    Command::cargo_bin("gitbatch")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gitbatch"));
}

#[test]
fn status_lists_repositories() {
    let ws = Workspace::new();
    ws.clone_repo("repos/api");
    ws.init("repos/local");

    gitbatch(&ws)
        .arg("status")
        .arg(repos(&ws))
        .assert()
        .success()
        .stdout(predicate::str::contains("api"))
        .stdout(predicate::str::contains("origin/main"))
        .stdout(predicate::str::contains("Initial commit"))
        .stderr(predicate::str::contains("no remote"));
}

#[test]
fn status_json() {
    let ws = Workspace::new();
    ws.clone_repo("repos/api");
    ws.init_empty("repos/empty");

    let output = gitbatch(&ws)
        .args(["status", "--json"])
        .arg(repos(&ws))
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "api");
    assert_eq!(rows[0]["branch"], "main");
    assert_eq!(rows[0]["state"], "available");
    assert_eq!(rows[0]["operational"], true);
    assert_eq!(rows[1]["name"], "empty");
    assert_eq!(rows[1]["operational"], false);
}

#[test]
fn pull_updates_repositories() {
    let ws = Workspace::new();
    let api = ws.clone_repo("repos/api");
    let web = ws.clone_repo("repos/web");
    let pushed = ws.push_upstream("news.txt", "news\n", "Upstream change");

    gitbatch(&ws)
        .args(["pull", "--jobs", "2"])
        .arg(repos(&ws))
        .assert()
        .success()
        .stdout(predicate::str::contains("api: pulled"))
        .stdout(predicate::str::contains("2 succeeded, 0 failed"));

    for repo in [api, web] {
        assert_eq!(common::git_output(&repo, &["rev-parse", "HEAD"]), pushed);
    }
}

#[test]
fn only_filters_repositories() {
    let ws = Workspace::new();
    let api = ws.clone_repo("repos/api");
    ws.clone_repo("repos/web");
    let before = common::git_output(&api, &["rev-parse", "HEAD"]);
    ws.push_upstream("news.txt", "news\n", "Upstream change");

    gitbatch(&ws)
        .args(["pull", "--only", "web"])
        .arg(repos(&ws))
        .assert()
        .success()
        .stdout(predicate::str::contains("web: pulled"))
        .stdout(predicate::str::contains("api").not());

    assert_eq!(common::git_output(&api, &["rev-parse", "HEAD"]), before);
}

#[test]
fn failed_repository_fails_command() {
    let ws = Workspace::new();
    ws.clone_repo("repos/api");
    let broken = ws.clone_repo("repos/broken");
    break_remote(&ws, &broken);

    gitbatch(&ws)
        .arg("fetch")
        .arg(repos(&ws))
        .assert()
        .failure()
        .stdout(predicate::str::contains("api: fetched"))
        .stderr(predicate::str::contains("broken: fetch from origin failed"))
        .stderr(predicate::str::contains("1 of 2 repositories failed to fetch"));
}

#[test]
fn run_uses_configured_mode() {
    let ws = Workspace::new();
    let api = ws.clone_repo("repos/api");
    let pushed = ws.push_upstream("news.txt", "news\n", "Upstream change");

    let config = ws.root().join("pull.toml");
    std::fs::write(
        &config,
        format!(
            "mode = \"pull\"\ndirectories = [\"{}\"]\n",
            repos(&ws).display()
        ),
    )
    .unwrap();

    Command::cargo_bin("gitbatch")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&config)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("api: pulled"));

    assert_eq!(common::git_output(&api, &["rev-parse", "HEAD"]), pushed);
}

#[test]
fn nothing_to_do() {
    let ws = Workspace::new();
    ws.init("repos/local");

    gitbatch(&ws)
        .arg("fetch")
        .arg(repos(&ws))
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to do."));
}

#[test]
fn invalid_config_is_reported() {
    let ws = Workspace::new();
    let config = ws.root().join("bad.toml");
    std::fs::write(&config, "depth = 0\n").unwrap();

    Command::cargo_bin("gitbatch")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("depth"));
}

#[test]
fn completion_generates_script() {
    let ws = Workspace::new();
    gitbatch(&ws)
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gitbatch"));
}
