//! Infrastructure layer with external service adapters.

/// Listing feed HTTP client.
pub mod api;
/// Application configuration.
pub mod config;
/// Image caching (disk, index, download, retry).
pub mod image;
/// Durable key-value storage.
pub mod storage;

pub use api::HttpListingSource;
pub use config::{AppConfig, CliArgs, Command, LogLevel, StorageManager};
pub use image::{BackgroundPreloader, DiskImageCache, HttpImageFetcher, ImageCache, RetryPolicy};
pub use storage::FileKeyValueStore;
