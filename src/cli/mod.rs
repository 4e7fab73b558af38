//! cli
//!
//! Command-line interface layer for gitbatch.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and set up logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`], which discovers, loads and runs repositories.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use crate::core::config::Config;
use crate::engine;
use crate::ui::logging;
use anyhow::{Context as _, Result};

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    let ctx = engine::Context {
        debug: cli.debug,
        quiet: cli.quiet,
        config,
    };

    let format = cli.log_format.unwrap_or_else(|| ctx.config.log_format());
    logging::init(ctx.verbosity(), format).context("Failed to initialize logging")?;
    if let Some(path) = ctx.config.loaded_from() {
        tracing::debug!(path = %path.display(), "configuration loaded");
    }

    commands::dispatch(cli.command, &ctx)
}
