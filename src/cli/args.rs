//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Read configuration from this file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--log-format <format>`: Log as plaintext or JSON

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::Mode;
use crate::ui::logging::LogFormat;

/// gitbatch - Fetch, merge and pull many local git repositories at once
#[derive(Parser, Debug)]
#[command(name = "gitbatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output: only errors and failed repositories
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Arguments shared by the batch commands.
#[derive(Args, Debug, Clone, Default)]
pub struct BatchArgs {
    /// Directories to scan (defaults to configured directories, then `.`)
    #[arg(value_name = "DIR")]
    pub dirs: Vec<PathBuf>,

    /// Maximum number of repositories worked on at once
    #[arg(long, short)]
    pub jobs: Option<usize>,

    /// Only include repositories with this name (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,

    /// Remove remote-tracking branches deleted on the remote
    #[arg(long)]
    pub prune: bool,

    /// Discovery depth below each directory
    #[arg(long)]
    pub depth: Option<usize>,

    /// Print the results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List repositories and their branch, remote and state
    #[command(
        name = "status",
        long_about = "List repositories and their branch, remote and state.\n\n\
            Loads every repository found under the given directories and shows \
            the active branch, the tracking branch it would merge, the head commit \
            and anything that keeps the repository out of batch operations.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Everything under the current directory
    gitbatch status

    # Two project folders, two levels deep
    gitbatch status ~/work ~/oss --depth 2

    # Machine-readable
    gitbatch status --json"
    )]
    Status {
        /// Directories to scan (defaults to configured directories, then `.`)
        #[arg(value_name = "DIR")]
        dirs: Vec<PathBuf>,

        /// Discovery depth below each directory
        #[arg(long)]
        depth: Option<usize>,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch the active remote of every repository
    #[command(
        name = "fetch",
        after_help = "\
WORKFLOW EXAMPLES:
    # Fetch everything under ~/work with 8 workers
    gitbatch fetch ~/work --jobs 8

    # Only two repositories
    gitbatch fetch --only api --only frontend"
    )]
    Fetch {
        #[command(flatten)]
        args: BatchArgs,
    },

    /// Fetch and merge the tracking branch of every repository
    #[command(name = "pull")]
    Pull {
        #[command(flatten)]
        args: BatchArgs,
    },

    /// Merge the tracking branch of every repository without fetching
    #[command(name = "merge")]
    Merge {
        #[command(flatten)]
        args: BatchArgs,
    },

    /// Run the configured mode (fetch unless configured otherwise)
    #[command(name = "run")]
    Run {
        #[command(flatten)]
        args: BatchArgs,

        /// Override the configured mode
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
INSTALLATION:
    # Bash
    gitbatch completion bash > ~/.local/share/bash-completion/completions/gitbatch

    # Zsh
    gitbatch completion zsh > ~/.zfunc/_gitbatch

    # Fish
    gitbatch completion fish > ~/.config/fish/completions/gitbatch.fish

    # PowerShell
    gitbatch completion powershell >> $PROFILE"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn batch_flags() {
        let cli = Cli::try_parse_from([
            "gitbatch", "pull", "a", "b", "--jobs", "3", "--only", "x", "--only", "y", "--prune",
        ])
        .unwrap();
        match cli.command {
            Command::Pull { args } => {
                assert_eq!(args.dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
                assert_eq!(args.jobs, Some(3));
                assert_eq!(args.only, vec!["x", "y"]);
                assert!(args.prune);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["gitbatch", "status", "--debug", "--log-format", "json"]).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn run_mode() {
        let cli = Cli::try_parse_from(["gitbatch", "run", "--mode", "merge"]).unwrap();
        match cli.command {
            Command::Run { mode, .. } => assert_eq!(mode, Some(Mode::Merge)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["gitbatch", "run", "--mode", "rebase"]).is_err());
    }
}
