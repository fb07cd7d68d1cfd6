//! Durable key-value storage port.

use async_trait::async_trait;

use crate::domain::errors::FeedError;

/// String-keyed durable storage for the listing snapshot and the image index.
///
/// Last writer wins; there is no transactional guarantee across keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    async fn get(&self, key: &str) -> Result<Option<String>, FeedError>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: String) -> Result<(), FeedError>;

    /// Removes a value. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), FeedError>;
}

/// Test doubles.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    /// In-memory key-value store for testing.
    #[derive(Clone, Default)]
    pub struct MockKeyValueStore {
        entries: Arc<RwLock<HashMap<String, String>>>,
        fail_writes: Arc<AtomicBool>,
        writes: Arc<AtomicUsize>,
    }

    impl MockKeyValueStore {
        /// Creates empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent `set` fail.
        pub fn set_fail_writes(&self, value: bool) {
            self.fail_writes.store(value, Ordering::SeqCst);
        }

        /// Number of successful writes so far.
        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        /// Reads a value without going through the trait.
        pub async fn peek(&self, key: &str) -> Option<String> {
            self.entries.read().await.get(key).cloned()
        }
    }

    #[async_trait]
    impl KeyValueStore for MockKeyValueStore {
        async fn get(&self, key: &str) -> Result<Option<String>, FeedError> {
            Ok(self.entries.read().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: String) -> Result<(), FeedError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(FeedError::storage("mock write failure"));
            }
            self.entries.write().await.insert(key.to_string(), value);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<(), FeedError> {
            self.entries.write().await.remove(key);
            Ok(())
        }
    }
}
