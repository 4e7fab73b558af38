//! repo::loader
//!
//! Builds a [`RepositoryEntity`] from a directory.
//!
//! Loading distinguishes hard failures, where no entity can be built at all,
//! from diagnostics, where an entity is built but cannot take part in remote
//! operations. Diagnostics come back next to the entity in [`Loaded`] so a
//! caller can still list and display a broken repository.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::entity::{Branch, LoadOptions, Remote, RepositoryEntity};
use super::state::RepoState;
use crate::core::types::RepoId;
use crate::git::{Git, GitError};

/// Errors and diagnostics from loading a repository.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The directory cannot be read.
    #[error("cannot read directory {path}: {source}")]
    PathUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The directory is not a usable git repository.
    #[error("{path} is not a repository: {source}")]
    NotARepository { path: PathBuf, source: GitError },

    /// Reading branches, commits or remotes failed.
    #[error("cannot read repository {path}: {source}")]
    Read { path: PathBuf, source: GitError },

    /// The repository has no commits.
    #[error("there is no commit for this repository: {path}")]
    EmptyRepository { path: PathBuf },

    /// HEAD is not on a branch.
    #[error("HEAD is detached in {path}")]
    DetachedHead { path: PathBuf },

    /// The repository has no remote configured.
    #[error("there is no remote for this repository: {path}")]
    NoRemote { path: PathBuf },
}

impl LoadError {
    /// Whether this came back alongside a usable entity.
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            LoadError::EmptyRepository { .. }
                | LoadError::DetachedHead { .. }
                | LoadError::NoRemote { .. }
        )
    }
}

/// A loaded entity and what, if anything, keeps it from remote operations.
#[derive(Debug)]
pub struct Loaded {
    /// The entity, always usable for display
    pub entity: RepositoryEntity,
    /// Why the entity cannot fetch/merge/pull, if it cannot
    pub diagnostic: Option<LoadError>,
}

impl Loaded {
    /// Whether the entity can take part in fetch/merge/pull.
    pub fn is_operational(&self) -> bool {
        self.diagnostic.is_none()
    }

    /// Split into entity and diagnostic.
    pub fn into_parts(self) -> (RepositoryEntity, Option<LoadError>) {
        (self.entity, self.diagnostic)
    }
}

/// Canonical path, base name and modification time of a directory.
pub(super) fn stat_dir(path: &Path) -> std::io::Result<(PathBuf, String, DateTime<Utc>)> {
    let path = std::fs::canonicalize(path)?;
    let metadata = std::fs::metadata(&path)?;
    if !metadata.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a directory",
        ));
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mod_time = DateTime::<Utc>::from(metadata.modified()?);
    Ok((path, name, mod_time))
}

impl RepositoryEntity {
    /// Load the repository in `path`.
    ///
    /// The active branch is the one HEAD points at. The active remote is
    /// chosen by `options.remote_policy`, and on it the tracking branch
    /// `<remote>/<active branch>` is selected when it exists.
    ///
    /// # Errors
    ///
    /// - [`LoadError::PathUnreadable`] if the directory cannot be read
    /// - [`LoadError::NotARepository`] if it is not a non-bare repository
    /// - [`LoadError::Read`] if branches, commits or remotes cannot be listed
    ///
    /// Empty repositories, a detached HEAD and missing remotes are reported
    /// through [`Loaded::diagnostic`] instead.
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Loaded, LoadError> {
        let (path, name, mod_time) = stat_dir(path).map_err(|source| {
            tracing::trace!(directory = %path.display(), "cannot open as directory");
            LoadError::PathUnreadable {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let git = Git::open(&path).map_err(|source| {
            tracing::trace!(directory = %path.display(), "cannot open directory as a git repository");
            LoadError::NotARepository {
                path: path.clone(),
                source,
            }
        })?;

        let mut entity = RepositoryEntity {
            id: RepoId::generate(),
            name,
            path,
            mod_time,
            git,
            options: options.clone(),
            branches: Vec::new(),
            branch: None,
            remotes: Vec::new(),
            remote: None,
            commits: Vec::new(),
            state: RepoState::Available,
            last_error: None,
        };

        let read_error = |entity: &RepositoryEntity, source| LoadError::Read {
            path: entity.path.clone(),
            source,
        };

        entity
            .load_branches()
            .map_err(|e| read_error(&entity, e))?;
        entity
            .load_commits()
            .map_err(|e| read_error(&entity, e))?;

        if entity.commits.is_empty() {
            let diagnostic = LoadError::EmptyRepository {
                path: entity.path.clone(),
            };
            tracing::debug!(repo = %entity.name, "{}", diagnostic);
            return Ok(Loaded {
                entity,
                diagnostic: Some(diagnostic),
            });
        }

        entity
            .load_remotes()
            .map_err(|e| read_error(&entity, e))?;

        let diagnostic = if entity.remotes.is_empty() {
            Some(LoadError::NoRemote {
                path: entity.path.clone(),
            })
        } else if entity.branch.is_none() {
            Some(LoadError::DetachedHead {
                path: entity.path.clone(),
            })
        } else {
            None
        };

        match &diagnostic {
            Some(d) => tracing::debug!(repo = %entity.name, "{}", d),
            None => tracing::debug!(
                repo = %entity.name,
                branch = %entity.branch().map(|b| b.name.as_str()).unwrap_or(""),
                remote = %entity.remote().map(|r| r.name.as_str()).unwrap_or(""),
                "repository loaded"
            ),
        }

        Ok(Loaded { entity, diagnostic })
    }

    /// Replace `branches` and re-select the branch HEAD points at.
    pub(super) fn load_branches(&mut self) -> Result<(), GitError> {
        let branches: Vec<Branch> = self
            .git
            .list_branches()?
            .into_iter()
            .map(Branch::from)
            .collect();
        let current = self.git.current_branch()?;
        let selected =
            current.and_then(|name| branches.iter().position(|b| b.name == name));

        self.branches = branches;
        self.branch = selected;
        Ok(())
    }

    /// Replace `commits` with the history of the active branch, or of HEAD
    /// when there is no active branch.
    pub(super) fn load_commits(&mut self) -> Result<(), GitError> {
        let from = self.branch().map(|b| b.name.clone());
        self.commits = self.git.list_commits(from.as_ref())?;
        Ok(())
    }

    /// Replace `remotes`, keeping the active remote by name when it still
    /// exists and falling back to the remote policy otherwise, then select
    /// the tracking branch of the active branch.
    pub(super) fn load_remotes(&mut self) -> Result<(), GitError> {
        let remotes: Vec<Remote> = self
            .git
            .list_remotes()?
            .into_iter()
            .map(Remote::from)
            .collect();
        let previous = self.remote().map(|r| r.name.clone());
        let selected = previous
            .and_then(|name| remotes.iter().position(|r| r.name == name))
            .or_else(|| self.options.remote_policy.choose(&remotes));

        self.remotes = remotes;
        self.remote = selected;
        // A repository without a matching tracking branch is still usable
        // for fetch; merge and pull check for the selection themselves.
        self.select_tracking_branch();
        Ok(())
    }
}
