//! ui::logging
//!
//! Diagnostic logging via `tracing`.
//!
//! Logs go to stderr so they never mix with command output. `RUST_LOG`
//! overrides the level picked from the verbosity flags.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::output::Verbosity;

/// Output format for log messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable plaintext format
    #[default]
    Plaintext,
    /// Structured JSON format
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Plaintext => write!(f, "plaintext"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Default log level for a verbosity.
pub fn level_for(verbosity: Verbosity) -> Level {
    match verbosity {
        Verbosity::Quiet => Level::ERROR,
        Verbosity::Normal => Level::WARN,
        Verbosity::Debug => Level::DEBUG,
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init(verbosity: Verbosity, format: LogFormat) -> anyhow::Result<()> {
    init_with_writer(level_for(verbosity), format, std::io::stderr)
}

/// Install the global subscriber writing to `writer`.
pub fn init_with_writer<W>(default_level: Level, format: LogFormat, writer: W) -> anyhow::Result<()>
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},gitbatch={}", Level::WARN, default_level)));

    match format {
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).json();
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
        LogFormat::Plaintext => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(false);
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
    }

    Ok(())
}
