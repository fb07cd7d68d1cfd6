//! Port definitions for fetching and preloading images.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::CacheResult;

/// Downloads raw image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetches the body at `url`.
    async fn fetch(&self, url: &str) -> CacheResult<Bytes>;
}

/// Fire-and-forget cache warming.
pub trait ImagePreloader: Send + Sync {
    /// Schedules `url` to be cached under its default key and returns
    /// immediately. Failures are logged by the implementation.
    fn preload(&self, url: String);
}

/// Test doubles.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use crate::domain::errors::CacheError;

    /// Bytes starting with the PNG signature.
    pub const PNG_BYTES: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    /// Fetcher that plays back scripted results, then a default.
    pub struct MockImageFetcher {
        script: Mutex<VecDeque<CacheResult<Bytes>>>,
        fallback: CacheResult<Bytes>,
        calls: Arc<AtomicUsize>,
        urls: Mutex<Vec<String>>,
    }

    impl MockImageFetcher {
        /// Always succeeds with a valid PNG.
        pub fn succeeding() -> Self {
            Self::with_fallback(Ok(Bytes::from_static(PNG_BYTES)))
        }

        /// Always fails with a network error.
        pub fn failing() -> Self {
            Self::with_fallback(Err(CacheError::NetworkError("mock offline".to_string())))
        }

        /// Fails `n` times, then succeeds with a valid PNG.
        pub fn failing_times(n: usize) -> Self {
            let fetcher = Self::succeeding();
            {
                let mut script = fetcher.script.lock();
                for i in 0..n {
                    script.push_back(Err(CacheError::NetworkError(format!("mock failure {i}"))));
                }
            }
            fetcher
        }

        fn with_fallback(fallback: CacheResult<Bytes>) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback,
                calls: Arc::new(AtomicUsize::new(0)),
                urls: Mutex::new(Vec::new()),
            }
        }

        /// Queues a one-off result.
        pub fn push_result(&self, result: CacheResult<Bytes>) {
            self.script.lock().push_back(result);
        }

        /// Number of fetches made.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// URLs fetched, in order.
        pub fn urls(&self) -> Vec<String> {
            self.urls.lock().clone()
        }
    }

    #[async_trait]
    impl ImageFetcher for MockImageFetcher {
        async fn fetch(&self, url: &str) -> CacheResult<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().push(url.to_string());
            let scripted = self.script.lock().pop_front();
            scripted.unwrap_or_else(|| self.fallback.clone())
        }
    }

    /// Preloader that records requested URLs.
    #[derive(Default)]
    pub struct RecordingPreloader {
        urls: Mutex<Vec<String>>,
    }

    impl RecordingPreloader {
        /// Creates empty recorder.
        pub fn new() -> Self {
            Self::default()
        }

        /// URLs submitted so far.
        pub fn urls(&self) -> Vec<String> {
            self.urls.lock().clone()
        }
    }

    impl ImagePreloader for RecordingPreloader {
        fn preload(&self, url: String) {
            self.urls.lock().push(url);
        }
    }
}
