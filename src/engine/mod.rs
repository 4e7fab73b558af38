//! engine
//!
//! Drives operations over many repositories: Discover -> Load -> Queue -> Run.
//!
//! # Architecture
//!
//! 1. **Discover**: turn directories into repository candidates
//! 2. **Load**: build a [`crate::repo::RepositoryEntity`] per candidate
//! 3. **Queue**: pick the repositories an operation applies to
//! 4. **Run**: apply one [`Mode`] to every queued repository concurrently
//!
//! # Invariants
//!
//! - Only `Queued` repositories are dispatched
//! - A repository is owned by at most one worker at a time
//! - One repository failing never stops the others
//!
//! # Example
//!
//! ```no_run
//! use gitbatch::engine::{discover, Batch, Mode};
//! use gitbatch::repo::LoadOptions;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = discover::discover(&["/src".into()], 1);
//! let entities = discover::load_all(&paths, &LoadOptions::default())
//!     .into_iter()
//!     .filter_map(|(_, loaded)| loaded.ok())
//!     .filter(|loaded| loaded.is_operational())
//!     .map(|loaded| loaded.entity)
//!     .collect();
//!
//! let mut batch = Batch::new(entities);
//! batch.queue_where(|_| true);
//! let report = batch.run(Mode::Fetch, 4).await?;
//! println!("{} failed", report.failed());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod discover;
pub mod modes;

pub use batch::{Batch, BatchError, BatchReport, RepoOutcome};
pub use modes::Mode;

use crate::core::config::Config;
use crate::ui::output::Verbosity;

/// Execution context for commands.
///
/// Global settings from CLI flags and the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Loaded configuration.
    pub config: Config,
}

impl Context {
    /// Output verbosity from the flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod context {
        use super::*;

        #[test]
        fn default_values() {
            let ctx = Context::default();
            assert!(!ctx.debug);
            assert!(!ctx.quiet);
            assert_eq!(ctx.verbosity(), Verbosity::Normal);
        }

        #[test]
        fn quiet_wins_over_debug() {
            let ctx = Context {
                debug: true,
                quiet: true,
                ..Context::default()
            };
            assert_eq!(ctx.verbosity(), Verbosity::Quiet);
        }
    }
}
