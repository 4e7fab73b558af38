//! repo::ops
//!
//! Fetch, merge and pull on a single repository.
//!
//! Every operation is a short sequence of [`Git`] calls followed by a
//! [`RepositoryEntity::refresh`], which reloads the cached branches, commits
//! and remotes from disk. Preconditions are checked before git is touched, so
//! an operation that is refused leaves both the repository and the cache as
//! they were.
//!
//! | Operation | Steps                                   | Refresh                  |
//! |-----------|-----------------------------------------|--------------------------|
//! | fetch     | fetch, refresh, checkout                | unless the fetch failed  |
//! | merge     | checkout, merge, refresh                | always                   |
//! | pull      | fetch, checkout, merge, refresh, checkout | unless the fetch failed|
//!
//! Once git has written anything, a failing step still refreshes before
//! returning and carries the refresh error alongside its own.

use std::path::PathBuf;

use thiserror::Error;

use super::entity::RepositoryEntity;
use super::loader::stat_dir;
use crate::core::types::BranchName;
use crate::git::{Git, GitError, MergeOutcome};

/// Errors from fetch, merge and pull.
#[derive(Debug, Error)]
pub enum OperationError {
    /// No remote is selected.
    #[error("no remote selected")]
    NoRemote,

    /// No local branch is active (empty repository or detached HEAD).
    #[error("no active branch")]
    NoActiveBranch,

    /// The active remote has no tracking branch for the active branch.
    #[error("no tracking branch {remote}/{branch}")]
    NoTrackingBranch { remote: String, branch: BranchName },

    /// Fetching the remote failed; nothing was refreshed.
    #[error("fetch from {remote} failed: {}", detail(.source))]
    FetchFailed { remote: String, source: GitError },

    /// Merging the tracking branch failed. The cache was refreshed
    /// afterwards; `refresh` holds the refresh error if that failed too.
    #[error("merge of {branch} failed: {}{}", detail(.source), also(.refresh))]
    MergeFailed {
        branch: BranchName,
        source: GitError,
        refresh: Option<RefreshError>,
    },

    /// Checking out the active branch failed. The cache was refreshed
    /// afterwards, as for [`OperationError::MergeFailed`].
    #[error("checkout of {branch} failed: {}{}", detail(.source), also(.refresh))]
    CheckoutFailed {
        branch: BranchName,
        source: GitError,
        refresh: Option<RefreshError>,
    },

    /// The operation panicked; the repository may be in any state.
    #[error("{operation} panicked: {message}")]
    Panicked { operation: String, message: String },

    /// The operation itself succeeded but reloading the cache failed.
    #[error(transparent)]
    RefreshFailed(#[from] RefreshError),
}

/// The part of a git error not already said by the operation message.
fn detail(source: &GitError) -> String {
    match source {
        GitError::FetchFailed { message, .. } => message.clone(),
        GitError::MergeConflict { .. } => "conflicts".to_string(),
        other => other.to_string(),
    }
}

fn also(refresh: &Option<RefreshError>) -> String {
    match refresh {
        Some(err) => format!("; {}", err),
        None => String::new(),
    }
}

/// The step of a refresh that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStage {
    Stat,
    Open,
    Branches,
    Commits,
    Remotes,
}

impl RefreshStage {
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshStage::Stat => "stat",
            RefreshStage::Open => "open",
            RefreshStage::Branches => "branches",
            RefreshStage::Commits => "commits",
            RefreshStage::Remotes => "remotes",
        }
    }
}

impl std::fmt::Display for RefreshStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refresh that stopped at `stage`. Stages before it were applied.
#[derive(Debug, Error)]
#[error("refresh of {path} failed at {stage}: {source}")]
pub struct RefreshError {
    pub path: PathBuf,
    pub stage: RefreshStage,
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl RefreshError {
    fn new(
        path: &std::path::Path,
        stage: RefreshStage,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            stage,
            source: source.into(),
        }
    }
}

impl RepositoryEntity {
    /// Fetch the active remote, refresh, and check out the active branch.
    ///
    /// # Errors
    ///
    /// - [`OperationError::NoRemote`] / [`OperationError::NoActiveBranch`]
    ///   before anything runs
    /// - [`OperationError::FetchFailed`]; the cache is left untouched
    /// - [`OperationError::RefreshFailed`] / [`OperationError::CheckoutFailed`]
    ///   after a successful fetch
    pub fn fetch(&mut self) -> Result<(), OperationError> {
        let (remote, _) = self.require_target()?;
        self.fetch_remote(&remote)?;
        self.refresh()?;
        self.checkout_active()?;
        tracing::debug!(repo = %self.name, remote = %remote, "fetch complete");
        Ok(())
    }

    /// Merge the selected tracking branch into the active branch.
    ///
    /// The cache is refreshed whether or not the merge succeeds.
    ///
    /// # Errors
    ///
    /// - [`OperationError::NoRemote`], [`OperationError::NoActiveBranch`],
    ///   [`OperationError::NoTrackingBranch`] before anything runs
    /// - [`OperationError::CheckoutFailed`] if the active branch cannot be
    ///   checked out
    /// - [`OperationError::MergeFailed`] if the merge stopped
    /// - [`OperationError::RefreshFailed`] after a successful merge
    pub fn merge(&mut self) -> Result<(), OperationError> {
        let tracking = self.require_tracking()?;
        self.checkout_active()?;
        self.merge_tracking(&tracking)?;
        self.refresh()?;
        Ok(())
    }

    /// Fetch the active remote and merge the tracking branch.
    ///
    /// The tracking branch must already be known before the fetch.
    ///
    /// # Errors
    ///
    /// - precondition errors as for [`RepositoryEntity::merge`]
    /// - [`OperationError::FetchFailed`]; nothing is merged or refreshed
    /// - [`OperationError::CheckoutFailed`], [`OperationError::MergeFailed`],
    ///   [`OperationError::RefreshFailed`] as for merge
    pub fn pull(&mut self) -> Result<(), OperationError> {
        let tracking = self.require_tracking()?;
        let (remote, _) = self.require_target()?;
        self.fetch_remote(&remote)?;
        self.checkout_active()?;
        self.merge_tracking(&tracking)?;
        self.refresh()?;
        self.checkout_active()?;
        Ok(())
    }

    /// Reload everything cached about the repository from disk.
    ///
    /// Re-stats the directory, reopens the handle, then reloads branches,
    /// commits and remotes in that order. The active branch follows HEAD; the
    /// active remote keeps its name when it still exists.
    ///
    /// # Errors
    ///
    /// Stops at the first failing stage with a [`RefreshError`]; the stages
    /// before it stay applied.
    pub fn refresh(&mut self) -> Result<(), RefreshError> {
        let (_, _, mod_time) = stat_dir(&self.path)
            .map_err(|e| RefreshError::new(&self.path, RefreshStage::Stat, e))?;
        self.mod_time = mod_time;

        self.git = Git::open(&self.path)
            .map_err(|e| RefreshError::new(&self.path, RefreshStage::Open, e))?;

        self.load_branches()
            .map_err(|e| RefreshError::new(&self.path, RefreshStage::Branches, e))?;
        self.load_commits()
            .map_err(|e| RefreshError::new(&self.path, RefreshStage::Commits, e))?;
        self.load_remotes()
            .map_err(|e| RefreshError::new(&self.path, RefreshStage::Remotes, e))?;

        tracing::trace!(
            repo = %self.name,
            branches = self.branches.len(),
            remotes = self.remotes.len(),
            commits = self.commits.len(),
            "refreshed"
        );
        Ok(())
    }

    // =========================================================================
    // Steps
    // =========================================================================

    /// Name of the active remote and the active branch.
    fn require_target(&self) -> Result<(String, BranchName), OperationError> {
        let remote = self.remote().ok_or(OperationError::NoRemote)?;
        let branch = self.branch().ok_or(OperationError::NoActiveBranch)?;
        Ok((remote.name.clone(), branch.name.clone()))
    }

    /// The selected tracking branch, e.g. `origin/main`.
    fn require_tracking(&self) -> Result<BranchName, OperationError> {
        let (remote, branch) = self.require_target()?;
        self.remote()
            .and_then(|r| r.branch())
            .map(|b| b.name.clone())
            .ok_or(OperationError::NoTrackingBranch { remote, branch })
    }

    fn fetch_remote(&self, remote: &str) -> Result<(), OperationError> {
        tracing::debug!(repo = %self.name, remote = %remote, "fetching");
        self.git
            .fetch(remote, self.options.prune)
            .map_err(|source| {
                tracing::warn!(repo = %self.name, remote = %remote, error = %source, "fetch failed");
                OperationError::FetchFailed {
                    remote: remote.to_string(),
                    source,
                }
            })
    }

    /// Check out the active branch; on failure refresh anyway and report both.
    fn checkout_active(&mut self) -> Result<(), OperationError> {
        let branch = self
            .branch()
            .map(|b| b.name.clone())
            .ok_or(OperationError::NoActiveBranch)?;
        match self.git.checkout(&branch) {
            Ok(()) => Ok(()),
            Err(source) => {
                tracing::warn!(repo = %self.name, branch = %branch, error = %source, "checkout failed");
                let refresh = self.refresh().err();
                Err(OperationError::CheckoutFailed {
                    branch,
                    source,
                    refresh,
                })
            }
        }
    }

    /// Merge `tracking`; on failure refresh anyway and report both.
    fn merge_tracking(&mut self, tracking: &BranchName) -> Result<(), OperationError> {
        match self.git.merge(tracking) {
            Ok(outcome) => {
                match outcome {
                    MergeOutcome::UpToDate => {
                        tracing::debug!(repo = %self.name, branch = %tracking, "already up to date")
                    }
                    MergeOutcome::FastForward { to } => {
                        tracing::debug!(repo = %self.name, branch = %tracking, to = %to.short(7), "fast-forward")
                    }
                    MergeOutcome::Merged { commit } => {
                        tracing::debug!(repo = %self.name, branch = %tracking, commit = %commit.short(7), "merged")
                    }
                }
                Ok(())
            }
            Err(source) => {
                tracing::warn!(repo = %self.name, branch = %tracking, error = %source, "merge failed");
                let refresh = self.refresh().err();
                Err(OperationError::MergeFailed {
                    branch: tracking.clone(),
                    source,
                    refresh,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod operation_error {
        use super::*;

        #[test]
        fn precondition_messages() {
            assert_eq!(OperationError::NoRemote.to_string(), "no remote selected");
            assert_eq!(OperationError::NoActiveBranch.to_string(), "no active branch");
            let err = OperationError::NoTrackingBranch {
                remote: "origin".to_string(),
                branch: BranchName::new("main").unwrap(),
            };
            assert_eq!(err.to_string(), "no tracking branch origin/main");
        }

        #[test]
        fn fetch_failed_names_remote() {
            let err = OperationError::FetchFailed {
                remote: "upstream".to_string(),
                source: GitError::FetchFailed {
                    remote: "upstream".to_string(),
                    message: "could not resolve host".to_string(),
                },
            };
            assert_eq!(
                err.to_string(),
                "fetch from upstream failed: could not resolve host"
            );
        }

        #[test]
        fn merge_failed_without_refresh_error() {
            let err = OperationError::MergeFailed {
                branch: BranchName::new("origin/main").unwrap(),
                source: GitError::MergeConflict {
                    branch: "origin/main".to_string(),
                },
                refresh: None,
            };
            assert_eq!(err.to_string(), "merge of origin/main failed: conflicts");
        }

        #[test]
        fn merge_failed_shows_refresh_error() {
            let err = OperationError::MergeFailed {
                branch: BranchName::new("origin/main").unwrap(),
                source: GitError::MergeConflict {
                    branch: "origin/main".to_string(),
                },
                refresh: Some(RefreshError::new(
                    std::path::Path::new("/tmp/repo"),
                    RefreshStage::Stat,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "repository vanished"),
                )),
            };
            assert_eq!(
                err.to_string(),
                "merge of origin/main failed: conflicts; \
                 refresh of /tmp/repo failed at stat: repository vanished"
            );
        }

        #[test]
        fn checkout_failed_shows_refresh_error() {
            let err = OperationError::CheckoutFailed {
                branch: BranchName::new("main").unwrap(),
                source: GitError::RefNotFound {
                    refname: "refs/heads/main".to_string(),
                },
                refresh: Some(RefreshError::new(
                    std::path::Path::new("/tmp/repo"),
                    RefreshStage::Open,
                    GitError::NotARepo {
                        path: PathBuf::from("/tmp/repo"),
                    },
                )),
            };
            let msg = err.to_string();
            assert!(msg.starts_with("checkout of main failed: ref not found: refs/heads/main; "));
            assert!(msg.contains("failed at open"));
        }

        #[test]
        fn panicked_names_operation() {
            let err = OperationError::Panicked {
                operation: "pull".to_string(),
                message: "boom".to_string(),
            };
            assert_eq!(err.to_string(), "pull panicked: boom");
        }

        #[test]
        fn refresh_failed_is_transparent() {
            let refresh = RefreshError::new(
                std::path::Path::new("/tmp/repo"),
                RefreshStage::Open,
                GitError::NotARepo {
                    path: PathBuf::from("/tmp/repo"),
                },
            );
            let expected = refresh.to_string();
            let err = OperationError::from(refresh);
            assert_eq!(err.to_string(), expected);
        }
    }

    mod refresh_error {
        use super::*;

        #[test]
        fn names_stage() {
            let err = RefreshError::new(
                std::path::Path::new("/tmp/repo"),
                RefreshStage::Stat,
                std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            );
            assert_eq!(err.stage, RefreshStage::Stat);
            assert_eq!(
                err.to_string(),
                "refresh of /tmp/repo failed at stat: gone"
            );
        }

        #[test]
        fn stage_names() {
            assert_eq!(RefreshStage::Branches.to_string(), "branches");
            assert_eq!(RefreshStage::Remotes.as_str(), "remotes");
        }
    }
}
