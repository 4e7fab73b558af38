//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations in
//! gitbatch. Every repository read and write flows through [`Git`], which
//! returns structured results and normalizes errors into typed failure
//! categories.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Path is not the root of a Git repository
//! - [`GitError::RemoteNotFound`]: Requested remote is not configured
//! - [`GitError::FetchFailed`]: Network or transport failure during fetch
//! - [`GitError::MergeConflict`]: Merge stopped with conflicts
//! - [`GitError::CheckoutConflict`]: Local changes would be overwritten
//! - [`GitError::OperationInProgress`]: Rebase/merge/cherry-pick in progress
//!
//! # Example
//!
//! ```ignore
//! use gitbatch::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("/work/service"))?;
//! git.fetch("origin", false)?;
//! let outcome = git.merge(&BranchName::new("origin/main")?)?;
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{BranchName, Oid, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Path is not a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported: {path}")]
    BareRepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Requested remote is not configured.
    #[error("remote not found: {name}")]
    RemoteNotFound {
        /// The remote name
        name: String,
    },

    /// Fetching from a remote failed.
    #[error("fetch from '{remote}' failed: {message}")]
    FetchFailed {
        /// The remote being fetched
        remote: String,
        /// Transport or protocol error
        message: String,
    },

    /// Merge stopped with conflicts; the merge is left in progress.
    #[error("merge of {branch} stopped with conflicts")]
    MergeConflict {
        /// The branch being merged
        branch: String,
    },

    /// Checkout would overwrite local changes.
    #[error("checkout conflict: {message}")]
    CheckoutConflict {
        /// Description from libgit2
        message: String,
    },

    /// HEAD does not point at a branch.
    #[error("HEAD is detached")]
    DetachedHead,

    /// HEAD points at a branch with no commits yet.
    #[error("HEAD is unborn")]
    UnbornHead,

    /// Git operation in progress (rebase, merge, etc.).
    #[error("{operation} in progress")]
    OperationInProgress {
        /// The type of operation in progress
        operation: GitState,
    },

    /// Merge commit needs an identity and none is configured.
    #[error("no committer identity configured: {message}")]
    NoIdentity {
        /// Description from libgit2
        message: String,
    },

    /// Invalid object id or branch name coming back from git.
    #[error("invalid value from git: {0}")]
    InvalidValue(#[from] TypeError),

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound if context.starts_with("refs/") => GitError::RefNotFound {
                refname: context.to_string(),
            },
            git2::ErrorCode::Conflict => GitError::CheckoutConflict {
                message: err.message().to_string(),
            },
            git2::ErrorCode::UnbornBranch => GitError::UnbornHead,
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

/// State of in-progress Git operations.
///
/// A repository in any state other than [`GitState::Clean`] is waiting for
/// the user to finish or abort something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitState {
    /// No operation in progress.
    Clean,
    /// Rebase in progress.
    Rebase,
    /// Merge in progress.
    Merge,
    /// Cherry-pick in progress.
    CherryPick,
    /// Revert in progress.
    Revert,
    /// Bisect in progress.
    Bisect,
    /// Apply mailbox in progress.
    ApplyMailbox,
}

impl GitState {
    /// Check if any operation is in progress.
    ///
    /// ```
    /// use gitbatch::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Merge.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    /// Get a human-readable description of the state.
    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Rebase => "rebase",
            GitState::Merge => "merge",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
            GitState::Bisect => "bisect",
            GitState::ApplyMailbox => "apply-mailbox",
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// A local branch and where it points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    /// Short branch name (`main`)
    pub name: BranchName,
    /// Tip commit
    pub oid: Oid,
    /// Configured upstream, e.g. `origin/main`
    pub upstream: Option<String>,
}

/// A remote-tracking branch and where it points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBranchInfo {
    /// Short name including the remote (`origin/main`)
    pub name: BranchName,
    /// Tip commit
    pub oid: Oid,
}

/// A configured remote with its remote-tracking branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    /// Remote name (`origin`)
    pub name: String,
    /// Fetch URL
    pub url: Option<String>,
    /// Remote-tracking branches under `refs/remotes/<name>/`, sorted by name
    pub branches: Vec<RemoteBranchInfo>,
}

/// Information about a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// First line of the commit message
    pub summary: String,
    /// Full commit message
    pub message: String,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author timestamp
    pub author_time: chrono::DateTime<chrono::Utc>,
    /// Committer timestamp
    pub commit_time: chrono::DateTime<chrono::Utc>,
    /// Parent commits (empty for a root commit)
    pub parents: Vec<Oid>,
}

/// What a merge did to the current branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Nothing to merge.
    UpToDate,
    /// Branch moved forward without a merge commit.
    FastForward {
        /// New tip
        to: Oid,
    },
    /// A merge commit was created.
    Merged {
        /// The merge commit
        commit: Oid,
    },
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. No other module
/// imports `git2`.
///
/// A `Git` value reflects the repository as it was when opened; callers that
/// need a fresh view after a mutation open a new one.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open the repository whose working directory is `path`.
    ///
    /// Unlike discovery, parent directories are not searched: a plain
    /// directory inside some other repository is not a repository itself.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `path` is not a repository
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo {
                path: path.to_path_buf(),
            });
        }

        Ok(Self { repo })
    }

    /// Path to the working directory.
    pub fn work_dir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Get the current Git state (rebase, merge, etc.).
    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge => GitState::Rebase,
            git2::RepositoryState::Merge => GitState::Merge,
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                GitState::CherryPick
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                GitState::Revert
            }
            git2::RepositoryState::Bisect => GitState::Bisect,
            git2::RepositoryState::ApplyMailbox | git2::RepositoryState::ApplyMailboxOrRebase => {
                GitState::ApplyMailbox
            }
        }
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    /// Get the current branch name, if on a branch.
    ///
    /// Returns `None` if HEAD is detached or unborn.
    pub fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        };

        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Some(BranchName::new(name)?));
            }
        }

        Ok(None)
    }

    /// List all local branches, sorted by name.
    ///
    /// Branches whose names are not valid UTF-8 or not valid refnames are
    /// skipped.
    pub fn list_branches(&self) -> Result<Vec<BranchInfo>, GitError> {
        let branches = self
            .repo
            .branches(Some(git2::BranchType::Local))
            .map_err(|e| GitError::from_git2(e, "list local branches"))?;

        let mut result = Vec::new();
        for entry in branches {
            let (branch, _) = entry?;
            let Some(name) = branch.name().ok().flatten() else {
                continue;
            };
            let Ok(name) = BranchName::new(name) else {
                continue;
            };
            let oid = branch
                .get()
                .peel_to_commit()
                .map_err(|e| GitError::from_git2(e, name.as_str()))?
                .id();
            let upstream = branch
                .upstream()
                .ok()
                .and_then(|up| up.name().ok().flatten().map(String::from));

            result.push(BranchInfo {
                name,
                oid: Oid::new(oid.to_string())?,
                upstream,
            });
        }

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    /// List configured remotes in config order, each with its
    /// remote-tracking branches.
    pub fn list_remotes(&self) -> Result<Vec<RemoteInfo>, GitError> {
        let names: Vec<String> = self
            .repo
            .remotes()
            .map_err(|e| GitError::from_git2(e, "list remotes"))?
            .iter()
            .flatten()
            .map(String::from)
            .collect();

        let mut remotes: Vec<RemoteInfo> = names
            .iter()
            .map(|name| RemoteInfo {
                name: name.clone(),
                url: self
                    .repo
                    .find_remote(name)
                    .ok()
                    .and_then(|r| r.url().map(String::from)),
                branches: Vec::new(),
            })
            .collect();

        let tracking = self
            .repo
            .branches(Some(git2::BranchType::Remote))
            .map_err(|e| GitError::from_git2(e, "list remote branches"))?;

        for entry in tracking {
            let (branch, _) = entry?;
            // Symbolic refs such as origin/HEAD are aliases, not branches.
            if branch.get().kind() != Some(git2::ReferenceType::Direct) {
                continue;
            }
            let Some(name) = branch.name().ok().flatten() else {
                continue;
            };
            let Some(owner) = owning_remote(&names, name) else {
                continue;
            };
            let Ok(branch_name) = BranchName::new(name) else {
                continue;
            };
            let oid = branch
                .get()
                .peel_to_commit()
                .map_err(|e| GitError::from_git2(e, name))?
                .id();

            if let Some(remote) = remotes.iter_mut().find(|r| r.name == owner) {
                remote.branches.push(RemoteBranchInfo {
                    name: branch_name,
                    oid: Oid::new(oid.to_string())?,
                });
            }
        }

        for remote in &mut remotes {
            remote.branches.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(remotes)
    }

    /// List commits reachable from a local branch (or HEAD when `from` is
    /// `None`), newest first.
    ///
    /// An unborn HEAD yields an empty list.
    pub fn list_commits(&self, from: Option<&BranchName>) -> Result<Vec<CommitInfo>, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;

        match from {
            Some(branch) => {
                let refname = format!("refs/heads/{}", branch);
                revwalk
                    .push_ref(&refname)
                    .map_err(|e| GitError::from_git2(e, &refname))?;
            }
            None => match revwalk.push_head() {
                Ok(()) => {}
                Err(e)
                    if e.code() == git2::ErrorCode::UnbornBranch
                        || e.code() == git2::ErrorCode::NotFound =>
                {
                    return Ok(Vec::new());
                }
                Err(e) => return Err(GitError::from_git2(e, "HEAD")),
            },
        }

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            commits.push(commit_info(&commit)?);
        }
        Ok(commits)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Fetch a remote using its configured refspecs.
    ///
    /// Credentials come from the ssh agent for ssh URLs and from the
    /// configured git credential helper for user/password prompts.
    ///
    /// # Errors
    ///
    /// - [`GitError::RemoteNotFound`] if the remote is not configured
    /// - [`GitError::FetchFailed`] for transport or protocol failures
    pub fn fetch(&self, remote: &str, prune: bool) -> Result<(), GitError> {
        let mut handle = self.repo.find_remote(remote).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound | git2::ErrorCode::InvalidSpec => {
                GitError::RemoteNotFound {
                    name: remote.to_string(),
                }
            }
            _ => GitError::from_git2(e, remote),
        })?;

        let config = self.repo.config().ok();
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(move |url, username_from_url, allowed| {
            if allowed.is_ssh_key() {
                if let Some(user) = username_from_url {
                    return git2::Cred::ssh_key_from_agent(user);
                }
            }
            if allowed.is_user_pass_plaintext() {
                if let Some(cfg) = config.as_ref() {
                    if let Ok(cred) = git2::Cred::credential_helper(cfg, url, username_from_url) {
                        return Ok(cred);
                    }
                }
            }
            git2::Cred::default()
        });

        let mut options = git2::FetchOptions::new();
        options.remote_callbacks(callbacks);
        if prune {
            options.prune(git2::FetchPrune::On);
        }

        handle
            .fetch(&[] as &[&str], Some(&mut options), None)
            .map_err(|e| GitError::FetchFailed {
                remote: remote.to_string(),
                message: e.message().to_string(),
            })
    }

    /// Check out a local branch and point HEAD at it.
    ///
    /// Uses a safe checkout: local modifications that would be overwritten
    /// abort the checkout with [`GitError::CheckoutConflict`].
    pub fn checkout(&self, branch: &BranchName) -> Result<(), GitError> {
        let refname = format!("refs/heads/{}", branch);
        let commit = self
            .repo
            .find_reference(&refname)
            .and_then(|r| r.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, &refname))?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, &refname))?;
        self.repo
            .set_head(&refname)
            .map_err(|e| GitError::from_git2(e, &refname))?;

        Ok(())
    }

    /// Merge a remote-tracking branch (`origin/main`) into the current branch.
    ///
    /// Up-to-date is a no-op. A fast-forward updates the working tree first
    /// and moves the branch ref only once the checkout succeeded. Otherwise a
    /// merge commit is created with the repository's configured identity. On
    /// conflicts the merge is left in progress for the user to resolve, the
    /// same way `git merge` leaves it.
    ///
    /// # Errors
    ///
    /// - [`GitError::OperationInProgress`] if another operation is unfinished
    /// - [`GitError::RefNotFound`] if the remote-tracking branch is missing
    /// - [`GitError::DetachedHead`] / [`GitError::UnbornHead`] if HEAD is not a branch with commits
    /// - [`GitError::MergeConflict`] if the merge stopped with conflicts
    pub fn merge(&self, source: &BranchName) -> Result<MergeOutcome, GitError> {
        let state = self.state();
        if state.is_in_progress() {
            return Err(GitError::OperationInProgress { operation: state });
        }

        let refname = format!("refs/remotes/{}", source);
        let reference = self
            .repo
            .find_reference(&refname)
            .map_err(|e| GitError::from_git2(e, &refname))?;
        let theirs = self.repo.reference_to_annotated_commit(&reference)?;
        let (analysis, _) = self.repo.merge_analysis(&[&theirs])?;

        if analysis.is_up_to_date() {
            return Ok(MergeOutcome::UpToDate);
        }

        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        if !head.is_branch() {
            return Err(GitError::DetachedHead);
        }
        let head_name = head.name().ok_or_else(|| GitError::Internal {
            message: "HEAD branch name is not valid UTF-8".to_string(),
        })?;
        let their_commit = self.repo.find_commit(theirs.id())?;

        if analysis.is_fast_forward() {
            let mut checkout = git2::build::CheckoutBuilder::new();
            checkout.safe();
            self.repo
                .checkout_tree(their_commit.as_object(), Some(&mut checkout))
                .map_err(|e| GitError::from_git2(e, &refname))?;
            self.repo
                .find_reference(head_name)?
                .set_target(
                    their_commit.id(),
                    &format!("gitbatch: fast-forward to {}", source),
                )
                .map_err(|e| GitError::from_git2(e, head_name))?;

            return Ok(MergeOutcome::FastForward {
                to: Oid::new(their_commit.id().to_string())?,
            });
        }

        if !analysis.is_normal() {
            return Err(GitError::Internal {
                message: format!("cannot merge {}: unsupported merge analysis", source),
            });
        }

        // Resolve the identity before touching the working tree so a missing
        // identity never leaves a half-started merge behind.
        let signature = self.repo.signature().map_err(|e| GitError::NoIdentity {
            message: e.message().to_string(),
        })?;
        let our_commit = head.peel_to_commit()?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .merge(&[&theirs], None, Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, &refname))?;

        let mut index = self.repo.index()?;
        if index.has_conflicts() {
            return Err(GitError::MergeConflict {
                branch: source.to_string(),
            });
        }

        let tree = self.repo.find_tree(index.write_tree()?)?;
        let commit = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &format!("Merge remote-tracking branch '{}'", source),
            &tree,
            &[&our_commit, &their_commit],
        )?;
        self.repo.cleanup_state()?;

        Ok(MergeOutcome::Merged {
            commit: Oid::new(commit.to_string())?,
        })
    }
}

/// Find which remote a remote-tracking branch (`origin/main`) belongs to.
///
/// Remote names may themselves contain `/`, so the longest matching remote
/// name wins.
fn owning_remote<'a>(remotes: &'a [String], branch: &str) -> Option<&'a str> {
    remotes
        .iter()
        .filter(|remote| {
            branch
                .strip_prefix(remote.as_str())
                .is_some_and(|rest| rest.len() > 1 && rest.starts_with('/'))
        })
        .max_by_key(|remote| remote.len())
        .map(String::as_str)
}

fn commit_info(commit: &git2::Commit<'_>) -> Result<CommitInfo, GitError> {
    let author = commit.author();
    let timestamp = |seconds: i64| {
        chrono::DateTime::from_timestamp(seconds, 0).unwrap_or(chrono::DateTime::UNIX_EPOCH)
    };

    let parents = commit
        .parent_ids()
        .map(|id| Oid::new(id.to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CommitInfo {
        oid: Oid::new(commit.id().to_string())?,
        summary: commit.summary().unwrap_or("").to_string(),
        message: commit.message().unwrap_or("").to_string(),
        author_name: author.name().unwrap_or("").to_string(),
        author_email: author.email().unwrap_or("").to_string(),
        author_time: timestamp(author.when().seconds()),
        commit_time: timestamp(commit.time().seconds()),
        parents,
    })
}
