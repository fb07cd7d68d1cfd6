//! Listing feed source port.

use async_trait::async_trait;

use crate::domain::entities::Listing;
use crate::domain::errors::FeedError;

/// Remote source of the full approved-listing collection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetches every approved listing.
    ///
    /// Anything other than a JSON array is reported as
    /// [`FeedError::InvalidPayload`].
    async fn fetch_listings(&self) -> Result<Vec<Listing>, FeedError>;
}
