//! Image caching infrastructure.
//!
//! This module provides:
//! - Disk storage for downloaded bytes
//! - An LRU index in front of the persistent image index
//! - HTTP download
//! - Preload and resolve with retry

pub mod disk_cache;
pub mod http_fetcher;
pub mod image_cache;
pub mod memory_cache;

pub use disk_cache::{DEFAULT_MAX_CACHE_SIZE, DiskImageCache};
pub use http_fetcher::{DEFAULT_FETCH_TIMEOUT_SECS, HttpImageFetcher};
pub use image_cache::{
    BackgroundPreloader, DEFAULT_BACKOFF_STEP, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_CONCURRENT_PRELOADS, INDEX_KEY_PREFIX, ImageCache, PreloadReport, RetryPolicy,
};
pub use memory_cache::{CacheStats, DEFAULT_INDEX_SIZE, MemoryIndex};
