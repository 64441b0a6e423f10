//! CLI argument definitions for deadwatch-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Deadwatch game-server log monitoring daemon.
///
/// Ingests Deadside game logs and killfeed files for all configured
/// servers, tracks player connection state, and delivers events.
#[derive(Parser, Debug)]
#[command(name = "deadwatch-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to deadwatch.toml configuration file.
    #[arg(short, long, default_value = "/etc/deadwatch/deadwatch.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the data directory for persisted state.
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
