//! Shared fixtures for integration tests.
//!
//! Repositories are built with the real `git` CLI inside a temp directory:
//! a bare `origin.git`, a `seed` working copy that pushes to it, and any
//! number of clones.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// A temp directory holding a bare remote and its working copies.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace with `origin.git` seeded from `seed` (one commit on
    /// `main`).
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let ws = Self { dir };

        run_git(ws.root(), &["init", "--bare", "--initial-branch=main", "origin.git"]);
        let seed = ws.init("seed");
        run_git(&seed, &["remote", "add", "origin", path_str(&ws.origin())]);
        run_git(&seed, &["push", "-u", "origin", "main"]);
        ws
    }

    /// Root of the workspace.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the bare remote.
    pub fn origin(&self) -> PathBuf {
        self.root().join("origin.git")
    }

    /// Path of the working copy that pushes upstream changes.
    pub fn seed(&self) -> PathBuf {
        self.root().join("seed")
    }

    /// Clone `origin.git` into `name`.
    pub fn clone_repo(&self, name: &str) -> PathBuf {
        run_git(self.root(), &["clone", "-q", path_str(&self.origin()), name]);
        let path = self.root().join(name);
        configure(&path);
        path
    }

    /// A repository with one commit and no remote.
    pub fn init(&self, name: &str) -> PathBuf {
        let path = self.init_empty(name);
        commit_file(&path, "README.md", "# Test Repo\n", "Initial commit");
        path
    }

    /// A repository without commits.
    pub fn init_empty(&self, name: &str) -> PathBuf {
        run_git(self.root(), &["init", "-q", "--initial-branch=main", name]);
        let path = self.root().join(name);
        configure(&path);
        path
    }

    /// Commit a file in `seed` and push it to `origin.git`.
    pub fn push_upstream(&self, file: &str, content: &str, message: &str) -> String {
        let seed = self.seed();
        let oid = commit_file(&seed, file, content, message);
        run_git(&seed, &["push", "-q", "origin", "main"]);
        oid
    }
}

fn configure(repo: &Path) {
    run_git(repo, &["config", "user.email", "test@example.com"]);
    run_git(repo, &["config", "user.name", "Test User"]);
    run_git(repo, &["config", "commit.gpgsign", "false"]);
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path is not UTF-8")
}

/// Write `file`, commit it, and return the new HEAD.
pub fn commit_file(repo: &Path, file: &str, content: &str, message: &str) -> String {
    std::fs::write(repo.join(file), content).unwrap();
    run_git(repo, &["add", file]);
    run_git(repo, &["commit", "-q", "-m", message]);
    git_output(repo, &["rev-parse", "HEAD"])
}

/// Run a git command in the given directory.
pub fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

/// Run a git command and return its trimmed stdout.
pub fn git_output(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}
