//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! Searched in order:
//! 1. `$GITBATCH_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitbatch/config.toml`
//! 3. `~/.gitbatch/config.toml`
//!
//! # Validation
//!
//! Config values are validated after parsing (e.g., `jobs` must be positive,
//! `default_remote` must be a usable remote name).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::engine::Mode;
use crate::ui::logging::LogFormat;

/// Deepest directory level discovery may descend to.
pub const MAX_DEPTH: usize = 5;

/// User configuration.
///
/// # Example
///
/// ```toml
/// directories = ["~/src", "/work/services"]
/// depth = 2
/// default_remote = "origin"
/// jobs = 8
/// prune = true
/// mode = "pull"
/// log_format = "json"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Directories scanned when none are given on the command line
    pub directories: Option<Vec<PathBuf>>,

    /// How many directory levels discovery descends
    pub depth: Option<usize>,

    /// Remote preferred over the first configured one
    pub default_remote: Option<String>,

    /// Maximum number of repositories worked on at once
    pub jobs: Option<usize>,

    /// Prune remote-tracking branches that no longer exist on fetch
    pub prune: Option<bool>,

    /// Mode used by `gitbatch run`
    pub mode: Option<Mode>,

    /// Log output format
    pub log_format: Option<LogFormat>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(depth) = self.depth {
            if depth == 0 || depth > MAX_DEPTH {
                return Err(ConfigError::InvalidValue(format!(
                    "depth must be between 1 and {}, got {}",
                    MAX_DEPTH, depth
                )));
            }
        }

        if self.jobs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "jobs must be at least 1".to_string(),
            ));
        }

        if let Some(remote) = &self.default_remote {
            if remote.is_empty() || remote.contains(char::is_whitespace) || remote.contains('/')
            {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid default_remote '{}'",
                    remote
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GlobalConfig::default();
        assert!(config.directories.is_none());
        assert!(config.default_remote.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn depth_bounds() {
        for (depth, ok) in [(0, false), (1, true), (MAX_DEPTH, true), (MAX_DEPTH + 1, false)] {
            let config = GlobalConfig {
                depth: Some(depth),
                ..Default::default()
            };
            assert_eq!(config.validate().is_ok(), ok, "depth {depth}");
        }
    }

    #[test]
    fn zero_jobs_rejected() {
        let config = GlobalConfig {
            jobs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_remote_rejected() {
        for remote in ["", "has space", "origin/main"] {
            let config = GlobalConfig {
                default_remote: Some(remote.to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{remote:?}");
        }
    }

    #[test]
    fn parses_enums() {
        let config: GlobalConfig = toml::from_str(
            r#"
            mode = "pull"
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, Some(Mode::Pull));
        assert_eq!(config.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn roundtrip() {
        let config = GlobalConfig {
            directories: Some(vec![PathBuf::from("/work")]),
            depth: Some(2),
            default_remote: Some("upstream".to_string()),
            jobs: Some(4),
            prune: Some(true),
            mode: Some(Mode::Merge),
            log_format: Some(LogFormat::Plaintext),
        };

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: GlobalConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn reject_unknown_fields() {
        let result: Result<GlobalConfig, _> = toml::from_str("trunk = \"main\"");
        assert!(result.is_err());
    }
}
