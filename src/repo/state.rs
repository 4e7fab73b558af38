//! repo::state
//!
//! Operation state of a repository within a batch run.
//!
//! ```text
//! Available ──► Queued ──► Working ──► Success
//!     ▲           │                 └─► Fail
//!     └───────────┘                        │
//!     ▲                                    │
//!     └──────────── reset ◄────────────────┘ (and from Success)
//! ```
//!
//! The state is independent of the repository's git state. Transitions go
//! through [`RepoState::transition`], which rejects anything not drawn above.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from state transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("illegal state transition: {from} -> {to}")]
    IllegalTransition { from: RepoState, to: RepoState },
}

/// Where a repository is in the batch lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoState {
    /// Ready to be picked for an operation.
    #[default]
    Available,
    /// Picked for the next batch run.
    Queued,
    /// An operation is running on this repository.
    Working,
    /// The last operation succeeded.
    Success,
    /// The last operation failed.
    Fail,
}

impl RepoState {
    /// All states, in lifecycle order.
    pub const ALL: [RepoState; 5] = [
        RepoState::Available,
        RepoState::Queued,
        RepoState::Working,
        RepoState::Success,
        RepoState::Fail,
    ];

    /// Whether `self -> to` is a legal transition.
    ///
    /// ```
    /// use gitbatch::repo::RepoState;
    ///
    /// assert!(RepoState::Queued.can_transition_to(RepoState::Working));
    /// assert!(!RepoState::Available.can_transition_to(RepoState::Working));
    /// ```
    pub fn can_transition_to(self, to: RepoState) -> bool {
        use RepoState::*;
        matches!(
            (self, to),
            (Available, Queued)
                | (Queued, Available)
                | (Queued, Working)
                | (Working, Success)
                | (Working, Fail)
                | (Success, Available)
                | (Fail, Available)
        )
    }

    /// Move to `to`, or report why not.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::IllegalTransition`] and leaves `self` unchanged
    /// if the transition is not allowed.
    pub fn transition(&mut self, to: RepoState) -> Result<(), StateError> {
        if !self.can_transition_to(to) {
            return Err(StateError::IllegalTransition { from: *self, to });
        }
        *self = to;
        Ok(())
    }

    /// Whether a batch run has finished with this repository.
    pub fn is_terminal(self) -> bool {
        matches!(self, RepoState::Success | RepoState::Fail)
    }

    /// Lowercase name used in output.
    pub fn as_str(self) -> &'static str {
        match self {
            RepoState::Available => "available",
            RepoState::Queued => "queued",
            RepoState::Working => "working",
            RepoState::Success => "success",
            RepoState::Fail => "fail",
        }
    }
}

impl std::fmt::Display for RepoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
