//! repo::entity
//!
//! The in-memory record of one on-disk repository.
//!
//! # Snapshots
//!
//! Branches, remotes and commits are a cached view of the repository as it
//! was when last read. They are replaced wholesale, together with the
//! selection that points into them, by the loader and by
//! [`RepositoryEntity::refresh`]; nothing patches them in place. Selections
//! are stored as positions into the cached sequences, so the active branch is
//! always a member of `branches` and the active remote a member of `remotes`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::ops::OperationError;
use super::state::{RepoState, StateError};
use crate::core::types::{BranchName, Fingerprint, Oid, RepoId};
use crate::git::{BranchInfo, CommitInfo, Git, RemoteBranchInfo, RemoteInfo};

/// A commit as reported by git. Read-only.
pub type Commit = CommitInfo;

/// A local branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Branch name
    pub name: BranchName,
    /// Tip commit when last read
    pub oid: Oid,
    /// Configured upstream, e.g. `origin/main`
    pub upstream: Option<String>,
}

impl From<BranchInfo> for Branch {
    fn from(info: BranchInfo) -> Self {
        Self {
            name: info.name,
            oid: info.oid,
            upstream: info.upstream,
        }
    }
}

/// A remote-tracking branch, e.g. `origin/main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBranch {
    /// Name including the remote prefix
    pub name: BranchName,
    /// Tip commit when last read
    pub oid: Oid,
}

impl From<RemoteBranchInfo> for RemoteBranch {
    fn from(info: RemoteBranchInfo) -> Self {
        Self {
            name: info.name,
            oid: info.oid,
        }
    }
}

/// A configured remote and its remote-tracking branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    /// Remote name
    pub name: String,
    /// Fetch URL
    pub url: Option<String>,
    /// Remote-tracking branches, sorted by name
    pub branches: Vec<RemoteBranch>,
    /// Position of the selected merge target in `branches`
    selected: Option<usize>,
}

impl From<RemoteInfo> for Remote {
    fn from(info: RemoteInfo) -> Self {
        Self {
            name: info.name,
            url: info.url,
            branches: info.branches.into_iter().map(RemoteBranch::from).collect(),
            selected: None,
        }
    }
}

impl Remote {
    /// The selected remote-tracking branch, used as fetch/merge target.
    pub fn branch(&self) -> Option<&RemoteBranch> {
        self.selected.and_then(|i| self.branches.get(i))
    }

    /// Try to select the remote-tracking branch called `name`
    /// (`origin/main`).
    ///
    /// Returns whether it was found. A miss is not an error: the previous
    /// selection, if any, stays in place.
    pub fn select_branch(&mut self, name: &str) -> bool {
        match self.branches.iter().position(|b| b.name.as_str() == name) {
            Some(i) => {
                self.selected = Some(i);
                true
            }
            None => false,
        }
    }

    /// Try to select the tracking branch `<remote>/<branch>`.
    pub fn select_tracking(&mut self, branch: &BranchName) -> bool {
        self.select_branch(&branch.on_remote(&self.name))
    }
}

/// How the active remote is chosen when a repository is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RemotePolicy {
    /// The first remote in git config order.
    #[default]
    First,
    /// The named remote when configured, the first remote otherwise.
    Prefer(String),
}

impl RemotePolicy {
    /// Position of the remote this policy picks.
    pub fn choose(&self, remotes: &[Remote]) -> Option<usize> {
        if remotes.is_empty() {
            return None;
        }
        match self {
            RemotePolicy::First => Some(0),
            RemotePolicy::Prefer(name) => remotes
                .iter()
                .position(|r| &r.name == name)
                .or(Some(0)),
        }
    }
}

/// Settings an entity is loaded with and keeps for later operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// How the active remote is chosen
    pub remote_policy: RemotePolicy,
    /// Whether fetch prunes remote-tracking branches gone from the remote
    pub prune: bool,
}

/// One on-disk repository and its cached git state.
#[derive(Debug)]
pub struct RepositoryEntity {
    pub(super) id: RepoId,
    pub(super) name: String,
    pub(super) path: PathBuf,
    pub(super) mod_time: DateTime<Utc>,
    pub(super) git: Git,
    pub(super) options: LoadOptions,
    pub(super) branches: Vec<Branch>,
    pub(super) branch: Option<usize>,
    pub(super) remotes: Vec<Remote>,
    pub(super) remote: Option<usize>,
    pub(super) commits: Vec<Commit>,
    pub(super) state: RepoState,
    pub(super) last_error: Option<OperationError>,
}

impl RepositoryEntity {
    /// Identity assigned at load time.
    pub fn id(&self) -> &RepoId {
        &self.id
    }

    /// Directory base name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path of the working directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time of the directory when last read.
    pub fn mod_time(&self) -> DateTime<Utc> {
        self.mod_time
    }

    /// The cached repository handle.
    pub fn git(&self) -> &Git {
        &self.git
    }

    /// All local branches, sorted by name.
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// The active branch.
    pub fn branch(&self) -> Option<&Branch> {
        self.branch.and_then(|i| self.branches.get(i))
    }

    /// All configured remotes.
    pub fn remotes(&self) -> &[Remote] {
        &self.remotes
    }

    /// The active remote.
    pub fn remote(&self) -> Option<&Remote> {
        self.remote.and_then(|i| self.remotes.get(i))
    }

    /// Commits reachable from the active branch, newest first.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// The head commit of the active branch.
    pub fn commit(&self) -> Option<&Commit> {
        self.commits.first()
    }

    /// Position in the batch lifecycle.
    pub fn state(&self) -> RepoState {
        self.state
    }

    /// Error of the last failed operation, kept for display.
    pub fn last_error(&self) -> Option<&OperationError> {
        self.last_error.as_ref()
    }

    /// Move to another batch state.
    ///
    /// Dispatching (`Queued -> Working`) clears the previous error.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::IllegalTransition`] for transitions the state
    /// machine does not allow; the state is left unchanged.
    pub fn transition(&mut self, to: RepoState) -> Result<(), StateError> {
        self.state.transition(to)?;
        if to == RepoState::Working {
            self.last_error = None;
        }
        tracing::trace!(repo = %self.name, state = %to, "state changed");
        Ok(())
    }

    /// Record the outcome of an operation and leave `Working`.
    pub fn finish(&mut self, result: Result<(), OperationError>) -> Result<(), StateError> {
        match result {
            Ok(()) => self.transition(RepoState::Success),
            Err(err) => {
                self.transition(RepoState::Fail)?;
                self.last_error = Some(err);
                Ok(())
            }
        }
    }

    /// Select another configured remote and its tracking branch for the
    /// active branch.
    ///
    /// Returns `false`, changing nothing, if no remote has that name.
    pub fn select_remote(&mut self, name: &str) -> bool {
        let Some(i) = self.remotes.iter().position(|r| r.name == name) else {
            return false;
        };
        self.remote = Some(i);
        self.select_tracking_branch();
        true
    }

    /// Try to select `<remote>/<active branch>` on the active remote.
    ///
    /// Returns whether a tracking branch is now selected for the active
    /// branch. Missing remote, branch or tracking branch are all misses.
    pub fn select_tracking_branch(&mut self) -> bool {
        let Some(branch) = self.branch().map(|b| b.name.clone()) else {
            return false;
        };
        match self.remote.and_then(|i| self.remotes.get_mut(i)) {
            Some(remote) => remote.select_tracking(&branch),
            None => false,
        }
    }

    /// Hash over local and remote-tracking branch tips.
    pub fn fingerprint(&self) -> Fingerprint {
        let local = self.branches.iter().map(|b| (b.name.as_str(), &b.oid));
        let tracking = self
            .remotes
            .iter()
            .flat_map(|r| r.branches.iter())
            .map(|b| (b.name.as_str(), &b.oid));
        Fingerprint::compute(local.chain(tracking))
    }
}
