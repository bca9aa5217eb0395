//! CLI argument definitions for warlog-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Warlog game server log collection daemon.
///
/// Polls configured game servers for admin logs, classifies them and
/// persists raw plus categorized views into partitioned JSON files.
#[derive(Parser, Debug)]
#[command(name = "warlog-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to warlog.toml configuration file.
    #[arg(short, long, default_value = "warlog.toml")]
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

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Print per-server storage statistics as JSON and exit.
    #[arg(long)]
    pub stats: bool,

    /// Delete stored log files older than the given number of days and exit.
    #[arg(long, value_name = "DAYS")]
    pub cleanup_days: Option<u32>,
}

impl DaemonCli {
    /// Whether the daemon should exit after a one-shot action
    /// instead of starting the collection loops.
    pub fn is_one_shot(&self) -> bool {
        self.validate || self.stats || self.cleanup_days.is_some()
    }
}
