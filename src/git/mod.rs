//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All repository reads and writes
//! flow through this interface. No other module should import `git2`, and
//! nothing shells out to the git CLI.
//!
//! # Responsibilities
//!
//! - Opening a repository at an exact path
//! - Enumerating local branches, remotes with their tracking branches, commits
//! - Fetch, checkout and merge
//! - In-progress operation detection
//!
//! # Invariants
//!
//! - All operations return strong types (Oid, BranchName)
//! - A `Git` handle is a snapshot; it is reopened after mutations by callers
//!   that cache derived state

mod interface;

pub use interface::{
    BranchInfo, CommitInfo, Git, GitError, GitState, MergeOutcome, RemoteBranchInfo, RemoteInfo,
};
