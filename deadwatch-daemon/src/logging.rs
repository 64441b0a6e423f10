//! Logging initialization for deadwatch-daemon.
//!
//! Builds the global `tracing-subscriber` stack from the `[general]`
//! section of the configuration. The output format is parsed into
//! [`LogFormat`] up front, so a bad format string fails before any
//! subscriber is installed.

use std::str::FromStr;

use anyhow::{Result, bail};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use deadwatch_core::config::GeneralConfig;

/// Output format for daemon logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Machine-parseable JSON lines (production default).
    Json,
    /// Human-readable colored output for development.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => bail!("unknown log format '{}', expected 'json' or 'pretty'", other),
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
/// `RUST_LOG` takes precedence over the configured log level.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let format: LogFormat = config.log_format.parse()?;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))
}
