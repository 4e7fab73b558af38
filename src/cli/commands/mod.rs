//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves directories and options from flags and configuration
//! 2. Calls the engine to discover, load and run repositories
//! 3. Formats and displays output
//!
//! Handlers do NOT touch repositories directly.
//!
//! # Async Commands
//!
//! Batch commands run the engine's async coordinator on a runtime created for
//! the duration of the command, so dispatch itself stays synchronous.

mod batch;
mod completion;
mod status;

// Re-export command functions for testing and direct invocation
pub use batch::batch;
pub use completion::completion;
pub use status::status;

use crate::cli::args::Command;
use crate::core::config::schema::MAX_DEPTH;
use crate::engine::{Context, Mode};
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Status { dirs, depth, json } => status::status(ctx, &dirs, depth, json),
        Command::Fetch { args } => batch::batch(ctx, Mode::Fetch, &args),
        Command::Pull { args } => batch::batch(ctx, Mode::Pull, &args),
        Command::Merge { args } => batch::batch(ctx, Mode::Merge, &args),
        Command::Run { args, mode } => {
            let mode = mode.unwrap_or_else(|| ctx.config.mode());
            batch::batch(ctx, mode, &args)
        }
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Directories from the command line, or the configured ones.
fn resolve_dirs(ctx: &Context, dirs: &[PathBuf]) -> Vec<PathBuf> {
    if dirs.is_empty() {
        ctx.config.directories()
    } else {
        dirs.to_vec()
    }
}

/// Discovery depth from the command line, or the configured one.
fn resolve_depth(ctx: &Context, depth: Option<usize>) -> Result<usize> {
    let depth = depth.unwrap_or_else(|| ctx.config.depth());
    if depth > MAX_DEPTH {
        bail!("depth must be at most {}, got {}", MAX_DEPTH, depth);
    }
    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_dirs_override_config() {
        let ctx = Context::default();
        let dirs = vec![PathBuf::from("/work")];
        assert_eq!(resolve_dirs(&ctx, &dirs), dirs);
    }

    #[test]
    fn config_dirs_when_none_given() {
        let ctx = Context::default();
        assert_eq!(resolve_dirs(&ctx, &[]), vec![PathBuf::from(".")]);
    }

    #[test]
    fn depth_flag_wins() {
        let ctx = Context::default();
        assert_eq!(resolve_depth(&ctx, Some(3)).unwrap(), 3);
        assert_eq!(resolve_depth(&ctx, None).unwrap(), 1);
    }

    #[test]
    fn depth_bounded() {
        let ctx = Context::default();
        assert!(resolve_depth(&ctx, Some(MAX_DEPTH + 1)).is_err());
    }
}
