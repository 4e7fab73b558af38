//! engine::modes
//!
//! The operation a batch run applies to every queued repository.
//!
//! # Example
//!
//! ```
//! use gitbatch::engine::Mode;
//!
//! assert_eq!(Mode::default(), Mode::Fetch);
//! assert_eq!(Mode::Pull.to_string(), "pull");
//! ```

use serde::{Deserialize, Serialize};

use crate::repo::{OperationError, RepositoryEntity};

/// Batch mode.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fetch the active remote.
    #[default]
    Fetch,
    /// Fetch, then merge the tracking branch.
    Pull,
    /// Merge the tracking branch without fetching.
    Merge,
}

impl Mode {
    /// Run this mode's operation on one entity.
    pub fn apply(self, entity: &mut RepositoryEntity) -> Result<(), OperationError> {
        match self {
            Mode::Fetch => entity.fetch(),
            Mode::Pull => entity.pull(),
            Mode::Merge => entity.merge(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Fetch => "fetch",
            Mode::Pull => "pull",
            Mode::Merge => "merge",
        }
    }

    /// Past tense, for result lines.
    pub fn done(self) -> &'static str {
        match self {
            Mode::Fetch => "fetched",
            Mode::Pull => "pulled",
            Mode::Merge => "merged",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
