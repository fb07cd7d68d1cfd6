//! Image cache orchestrator.
//!
//! Lookups go memory index -> persistent index -> network. The persistent
//! index maps `image_cache:<key>` to a file path; an entry whose file is gone
//! is treated as a miss and rewritten after the next download.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, trace, warn};

use crate::domain::entities::{
    CacheKey, ImageCacheEntry, ImageLocation, ImageSource, PreloadOutcome, ResolvedImage,
};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{ImageFetcher, ImagePreloader, KeyValueStore};

use super::disk_cache::DiskImageCache;
use super::memory_cache::{CacheStats, MemoryIndex};

/// Prefix of image index keys in the key-value store.
pub const INDEX_KEY_PREFIX: &str = "image_cache:";

/// Default number of attempts per resolve.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default backoff step; the wait after attempt `n` is `n` steps.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_secs(1);
/// Default number of concurrent background preloads.
pub const DEFAULT_MAX_CONCURRENT_PRELOADS: usize = 4;

/// Retry schedule for [`ImageCache::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Linear backoff step.
    pub backoff_step: Duration,
}

impl RetryPolicy {
    /// Wait after the `attempt`-th failure (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }
}

fn index_key(key: &CacheKey) -> String {
    format!("{INDEX_KEY_PREFIX}{key}")
}

/// Persistent URL-to-file image cache.
pub struct ImageCache {
    disk: Arc<DiskImageCache>,
    memory: MemoryIndex,
    index: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn ImageFetcher>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("dir", &self.disk.dir())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ImageCache {
    /// Creates a cache over the given storage and fetcher.
    #[must_use]
    pub fn new(
        disk: Arc<DiskImageCache>,
        index: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn ImageFetcher>,
        memory_index_size: usize,
    ) -> Self {
        Self {
            disk,
            memory: MemoryIndex::new(memory_index_size),
            index,
            fetcher,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry schedule.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns a usable index entry for `key`, if its file still exists.
    pub async fn lookup(&self, key: &CacheKey) -> Option<ImageCacheEntry> {
        if let Some(path) = self.memory.get(key).await {
            if self.disk.exists(&path).await {
                return Some(ImageCacheEntry {
                    cache_key: key.clone(),
                    local_path: path,
                });
            }
            self.memory.evict(key).await;
        }

        let stored = match self.index.get(&index_key(key)).await {
            Ok(stored) => stored?,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read image index");
                return None;
            }
        };

        let path = PathBuf::from(stored);
        if !self.disk.exists(&path).await {
            debug!(key = %key, path = %path.display(), "Indexed image file is gone");
            return None;
        }

        self.memory.put(key.clone(), path.clone()).await;
        Some(ImageCacheEntry {
            cache_key: key.clone(),
            local_path: path,
        })
    }

    /// Makes sure a local copy of `url` exists under `cache_key` (or the
    /// URL's default key). Never returns an error; failures are logged.
    pub async fn preload(&self, url: &str, cache_key: Option<&CacheKey>) -> PreloadOutcome {
        let key = cache_key
            .cloned()
            .unwrap_or_else(|| CacheKey::from_url(url));

        match self.ensure_cached(url, &key).await {
            Ok(path) => {
                trace!(key = %key, path = %path.display(), "Preloaded image");
                PreloadOutcome::Ok
            }
            Err(e) => {
                warn!(url = url, error = %e, "Image preload failed");
                PreloadOutcome::Failed(e.to_string())
            }
        }
    }

    /// Resolves an image for display, retrying remote loads.
    ///
    /// Bundled assets resolve immediately. Remote sources with a key go
    /// through the cache; without a key they are fetched directly and never
    /// written to disk.
    pub async fn resolve(
        &self,
        source: &ImageSource,
        cache_key: Option<&CacheKey>,
    ) -> ResolvedImage {
        let url = match source {
            ImageSource::Bundled(asset) => {
                return ResolvedImage::Loaded(ImageLocation::Bundled(*asset));
            }
            ImageSource::Remote(url) => url,
        };

        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let result = match cache_key {
                Some(key) => self
                    .ensure_cached(url, key)
                    .await
                    .map(ImageLocation::Local),
                None => self.fetch_direct(url).await,
            };

            match result {
                Ok(location) => {
                    debug!(url = %url, attempt = attempt, "Resolved image");
                    return ResolvedImage::Loaded(location);
                }
                Err(e) => {
                    warn!(url = %url, attempt = attempt, error = %e, "Image load attempt failed");
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    }
                }
            }
        }

        ResolvedImage::Errored {
            attempts: max_attempts,
            reason: last_error,
        }
    }

    /// Drops every cached file and the in-memory index. Persistent index
    /// entries left behind point at missing files and read as misses.
    ///
    /// # Errors
    /// Returns error if the cache directory cannot be read.
    pub async fn clear(&self) -> CacheResult<()> {
        self.memory.clear().await;
        self.disk.clear().await?;
        info!("Cleared image cache");
        Ok(())
    }

    /// Returns memory index statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.memory.stats()
    }

    async fn ensure_cached(&self, url: &str, key: &CacheKey) -> CacheResult<PathBuf> {
        if let Some(entry) = self.lookup(key).await {
            trace!(key = %key, "Image already cached");
            return Ok(entry.local_path);
        }

        let bytes = self.fetcher.fetch(url).await?;
        verify_image(&bytes)?;

        let path = self.disk.put_bytes(key, &bytes).await?;
        // Another writer's size cleanup may have reclaimed the file already.
        if !self.disk.exists(&path).await {
            return Err(CacheError::IoError(format!(
                "Cached file vanished after write: {}",
                path.display()
            )));
        }

        let stored = path.to_string_lossy().into_owned();
        if let Err(e) = self.index.set(&index_key(key), stored).await {
            warn!(key = %key, error = %e, "Failed to record image in index");
        }
        self.memory.put(key.clone(), path.clone()).await;

        debug!(key = %key, path = %path.display(), "Cached image");
        Ok(path)
    }

    async fn fetch_direct(&self, url: &str) -> CacheResult<ImageLocation> {
        let bytes = self.fetcher.fetch(url).await?;
        verify_image(&bytes)?;
        Ok(ImageLocation::Remote {
            url: url.to_string(),
            bytes,
        })
    }
}

fn verify_image(bytes: &Bytes) -> CacheResult<()> {
    image::guess_format(bytes)
        .map(|_| ())
        .map_err(|e| CacheError::DecodeError(format!("Unrecognized image data: {e}")))
}

/// Runs [`ImageCache::preload`] on background tasks with bounded concurrency.
///
/// Finished tasks are reaped on every new preload, so a long-lived caller
/// never has to call [`BackgroundPreloader::flush`].
pub struct BackgroundPreloader {
    cache: Arc<ImageCache>,
    semaphore: Arc<Semaphore>,
    tasks: Mutex<PreloadTasks>,
}

#[derive(Default)]
struct PreloadTasks {
    running: JoinSet<PreloadOutcome>,
    finished: PreloadReport,
}

impl PreloadTasks {
    fn reap(&mut self) {
        while let Some(result) = self.running.try_join_next() {
            self.finished.record(result);
        }
    }
}

/// Tally of finished background preloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadReport {
    /// Preloads that left a local copy.
    pub succeeded: usize,
    /// Preloads that failed or panicked.
    pub failed: usize,
}

impl PreloadReport {
    fn record(&mut self, result: Result<PreloadOutcome, JoinError>) {
        match result {
            Ok(PreloadOutcome::Ok) => self.succeeded += 1,
            Ok(PreloadOutcome::Failed(_)) => self.failed += 1,
            Err(e) => {
                warn!(error = %e, "Preload task panicked");
                self.failed += 1;
            }
        }
    }
}

impl BackgroundPreloader {
    /// Creates a preloader over `cache`.
    #[must_use]
    pub fn new(cache: Arc<ImageCache>, max_concurrent: usize) -> Self {
        Self {
            cache,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tasks: Mutex::new(PreloadTasks::default()),
        }
    }

    /// Number of scheduled preloads still running.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.reap();
        tasks.running.len()
    }

    /// Waits for every scheduled preload to finish and returns the tally
    /// since the last flush.
    pub async fn flush(&self) -> PreloadReport {
        let PreloadTasks {
            mut running,
            mut finished,
        } = std::mem::take(&mut *self.tasks.lock());

        while let Some(result) = running.join_next().await {
            finished.record(result);
        }
        finished
    }
}

impl ImagePreloader for BackgroundPreloader {
    fn preload(&self, url: String) {
        let cache = self.cache.clone();
        let semaphore = self.semaphore.clone();

        let mut tasks = self.tasks.lock();
        tasks.reap();
        tasks.running.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return PreloadOutcome::Failed("preloader shut down".to_string());
            };
            cache.preload(&url, None).await
        });
    }
}
