//! core::config
//!
//! Configuration loading and accessors.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (applied by the caller)
//!
//! # Locations
//!
//! Searched in order, first existing file wins:
//! 1. `$GITBATCH_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitbatch/config.toml`
//! 3. `~/.gitbatch/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use gitbatch::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("Workers: {}", config.jobs());
//! println!("Discovery depth: {}", config.depth());
//! ```

pub mod schema;

pub use schema::GlobalConfig;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::Mode;
use crate::repo::{LoadOptions, RemotePolicy};
use crate::ui::logging::LogFormat;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaulting accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Values from the config file
    pub global: GlobalConfig,
    /// Path to the config file (if one was loaded)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed or
    /// validated. A missing file is not an error (defaults are used).
    pub fn load() -> Result<Self, ConfigError> {
        match Self::locate() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let global: GlobalConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        global.validate()?;

        Ok(Self {
            global,
            path: Some(path.to_path_buf()),
        })
    }

    /// Find the first existing config file.
    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("GITBATCH_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitbatch/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".gitbatch/config.toml"))
            .filter(|path| path.exists())
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Directories to scan when none are given on the command line.
    ///
    /// A leading `~/` is expanded to the home directory. Defaults to the
    /// current directory.
    pub fn directories(&self) -> Vec<PathBuf> {
        match &self.global.directories {
            Some(dirs) if !dirs.is_empty() => dirs.iter().map(|d| expand_home(d)).collect(),
            _ => vec![PathBuf::from(".")],
        }
    }

    /// Discovery depth. Defaults to 1 (immediate children).
    pub fn depth(&self) -> usize {
        self.global.depth.unwrap_or(1)
    }

    /// How the default remote of a repository is chosen.
    pub fn remote_policy(&self) -> RemotePolicy {
        match &self.global.default_remote {
            Some(name) => RemotePolicy::Prefer(name.clone()),
            None => RemotePolicy::First,
        }
    }

    /// Maximum concurrent workers. Defaults to the available parallelism.
    pub fn jobs(&self) -> usize {
        self.global.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Whether fetch prunes stale remote-tracking branches. Defaults to `false`.
    pub fn prune(&self) -> bool {
        self.global.prune.unwrap_or(false)
    }

    /// Options repositories are loaded with.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            remote_policy: self.remote_policy(),
            prune: self.prune(),
        }
    }

    /// Mode for `gitbatch run`. Defaults to fetch.
    pub fn mode(&self) -> Mode {
        self.global.mode.unwrap_or_default()
    }

    /// Log format. Defaults to plaintext.
    pub fn log_format(&self) -> LogFormat {
        self.global.log_format.unwrap_or_default()
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
