//! repo
//!
//! The repository entity: one on-disk working copy, its cached branches,
//! remotes and commits, and its place in the batch lifecycle.
//!
//! # Modules
//!
//! - [`entity`] - The record itself and its selections
//! - [`loader`] - Building an entity from a directory
//! - [`ops`] - Fetch, merge, pull and refresh
//! - [`state`] - The `Available -> Queued -> Working -> Success/Fail` machine
//!
//! # Invariants
//!
//! - The active branch is a member of `branches`, the active remote a member
//!   of `remotes`
//! - Cached collections are replaced wholesale, never patched
//! - Every mutating operation ends with a refresh, except a failed fetch

pub mod entity;
pub mod loader;
pub mod ops;
pub mod state;

pub use entity::{Branch, Commit, LoadOptions, Remote, RemoteBranch, RemotePolicy, RepositoryEntity};
pub use loader::{LoadError, Loaded};
pub use ops::{OperationError, RefreshError, RefreshStage};
pub use state::{RepoState, StateError};
