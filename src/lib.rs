//! gitbatch - Fetch, merge and pull many local git repositories at once
//!
//! gitbatch discovers working copies under a set of directories, loads each
//! one into a [`repo::RepositoryEntity`], and runs fetch, merge or pull over
//! all of them concurrently, tracking every repository through a small state
//! machine.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Discovers, loads, queues and runs repositories in batches
//! - [`repo`] - The repository entity, its operations and its state machine
//! - [`core`] - Domain types and configuration
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - Output formatting and logging
//!
//! # Correctness Invariants
//!
//! 1. The active branch and remote are always members of the cached lists
//! 2. Cached branches, remotes and commits are replaced wholesale on refresh
//! 3. State changes only through the guarded transition function
//! 4. A repository is never operated on by two workers at once

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod repo;
pub mod ui;
