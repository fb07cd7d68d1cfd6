//! Command-line arguments.

use super::app_config::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments. Options override `config.toml`.
#[derive(Debug, Parser)]
#[command(
    name = "propfeed",
    version,
    about = "Cached property listing feed with image preloading",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Base URL of the listing API.
    #[arg(long, env = "PROPFEED_API_URL", value_name = "URL")]
    pub api_base_url: Option<String>,

    /// Hours a listing snapshot is served without refetching.
    #[arg(long, value_name = "HOURS")]
    pub snapshot_ttl_hours: Option<u64>,

    /// Cache directory for downloaded images.
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Action to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print listings grouped by freshness, refreshing the snapshot if stale.
    Feed {
        /// Print the grouped listings as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Resolve one image URL through the cache.
    Resolve {
        /// Raw image URL; repaired before use.
        url: String,
        /// Cache key. Without one the image is fetched directly and not stored.
        #[arg(long)]
        key: Option<String>,
    },
    /// Drop the listing snapshot and every cached image.
    Clear,
}
