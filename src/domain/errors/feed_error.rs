//! Listing feed error types.

use thiserror::Error;

/// Errors raised while fetching or persisting the listing feed.
///
/// These never cross the listing cache's public contract; the cache logs
/// them and degrades to an empty collection or a cache miss.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum FeedError {
    #[error("network error while fetching listings: {message}")]
    Network { message: String },

    #[error("listing endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("invalid listing payload: {reason}")]
    InvalidPayload { reason: String },

    #[error("key-value storage error: {message}")]
    Storage { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FeedError {
    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates invalid payload error.
    #[must_use]
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }

    /// Creates storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Returns whether the failure came from the network side.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Status { .. })
    }

    /// Returns whether upstream sent something other than a listing array.
    #[must_use]
    pub const fn is_payload_error(&self) -> bool {
        matches!(self, Self::InvalidPayload { .. })
    }
}
