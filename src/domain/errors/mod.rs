//! Domain error types.

mod cache_error;
mod feed_error;

pub use cache_error::{CacheError, CacheResult};
pub use feed_error::FeedError;
