//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::args::CliArgs;
use crate::domain::entities::ListingFields;
use crate::infrastructure::api::{DEFAULT_API_BASE, DEFAULT_LISTINGS_PATH, DEFAULT_TIMEOUT_SECS};
use crate::infrastructure::image::{
    DEFAULT_INDEX_SIZE, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CACHE_SIZE,
    DEFAULT_MAX_CONCURRENT_PRELOADS, RetryPolicy,
};

const APP_NAME: &str = "propfeed";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "propfeed";

const IMAGES_DIR_NAME: &str = "images";

/// Project directories for this application, if the platform has them.
#[must_use]
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, loaded from `config.toml` and CLI overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path. Logs go to stderr when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Listing feed endpoint.
    #[serde(default)]
    pub api: ApiConfig,

    /// Snapshot and image cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Image resolve retry schedule.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Upstream field names.
    #[serde(default)]
    pub fields: ListingFields,
}

/// Listing feed endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the approved-listings endpoint.
    #[serde(default = "default_listings_path")]
    pub listings_path: String,

    /// Request timeout in seconds, for the feed and image downloads.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            listings_path: default_listings_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Snapshot and image cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a listing snapshot is served without refetching.
    #[serde(default = "default_snapshot_ttl_hours")]
    pub snapshot_ttl_hours: u64,

    /// Entries kept in the in-memory image index.
    #[serde(default = "default_memory_index_size")]
    pub memory_index_size: usize,

    /// Upper bound for downloaded images on disk, in MiB.
    #[serde(default = "default_disk_cache_size_mb")]
    pub disk_cache_size_mb: u64,

    /// Background preloads allowed to run at once.
    #[serde(default = "default_max_concurrent_preloads")]
    pub max_concurrent_preloads: usize,

    /// Directory for downloaded images. Platform cache dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Directory for the durable key-value store. Platform data dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl_hours: default_snapshot_ttl_hours(),
            memory_index_size: default_memory_index_size(),
            disk_cache_size_mb: default_disk_cache_size_mb(),
            max_concurrent_preloads: default_max_concurrent_preloads(),
            cache_dir: None,
            data_dir: None,
        }
    }
}

/// Image resolve retry schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per resolve.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff step in milliseconds.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_step_ms: default_backoff_step_ms(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_listings_path() -> String {
    DEFAULT_LISTINGS_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_snapshot_ttl_hours() -> u64 {
    24
}

fn default_memory_index_size() -> usize {
    DEFAULT_INDEX_SIZE
}

fn default_disk_cache_size_mb() -> u64 {
    DEFAULT_MAX_CACHE_SIZE / (1024 * 1024)
}

fn default_max_concurrent_preloads() -> usize {
    DEFAULT_MAX_CONCURRENT_PRELOADS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_step_ms() -> u64 {
    1000
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(base_url) = &args.api_base_url {
            self.api.base_url.clone_from(base_url);
        }
        if let Some(hours) = args.snapshot_ttl_hours {
            self.cache.snapshot_ttl_hours = hours;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache.cache_dir = Some(cache_dir.clone());
        }
    }

    /// Directory holding downloaded image files.
    #[must_use]
    pub fn effective_image_dir(&self) -> Option<PathBuf> {
        self.cache
            .cache_dir
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.cache_dir().to_path_buf()))
            .map(|dir| dir.join(IMAGES_DIR_NAME))
    }

    /// Directory holding the durable key-value store.
    #[must_use]
    pub fn effective_data_dir(&self) -> Option<PathBuf> {
        self.cache
            .data_dir
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
    }

    /// Snapshot lifetime.
    #[must_use]
    pub const fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.snapshot_ttl_hours.saturating_mul(60 * 60))
    }

    /// Disk budget for images in bytes.
    #[must_use]
    pub const fn disk_cache_bytes(&self) -> u64 {
        self.cache.disk_cache_size_mb.saturating_mul(1024 * 1024)
    }

    /// Retry schedule for image resolves.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            backoff_step: Duration::from_millis(self.retry.backoff_step_ms),
        }
    }
}
