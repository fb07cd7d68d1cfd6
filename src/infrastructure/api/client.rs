//! HTTP client for the approved-listings feed.

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::entities::Listing;
use crate::domain::errors::FeedError;
use crate::domain::ports::ListingSource;

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "http://localhost:5000";
/// Default path of the approved-listings endpoint.
pub const DEFAULT_LISTINGS_PATH: &str = "/api/properties/approved";
/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("propfeed/", env!("CARGO_PKG_VERSION"));

/// Fetches the listing collection over HTTP.
pub struct HttpListingSource {
    client: Client,
    listings_url: String,
}

impl HttpListingSource {
    /// Creates a source with the default endpoint.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new() -> Result<Self, FeedError> {
        Self::with_endpoint(DEFAULT_API_BASE, DEFAULT_LISTINGS_PATH, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a source for `base_url` + `listings_path`.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn with_endpoint(
        base_url: &str,
        listings_path: &str,
        timeout_secs: u64,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FeedError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            listings_url: join_url(base_url, listings_path),
        })
    }

    /// Full URL of the listings endpoint.
    #[must_use]
    pub fn listings_url(&self) -> &str {
        &self.listings_url
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turns a decoded response body into listings.
///
/// # Errors
/// Returns [`FeedError::InvalidPayload`] unless the body is a JSON array.
pub fn parse_listing_payload(body: Value) -> Result<Vec<Listing>, FeedError> {
    match body {
        Value::Array(items) => Ok(items.into_iter().map(Listing::new).collect()),
        Value::Null => Err(FeedError::invalid_payload("expected an array, got null")),
        Value::Object(_) => Err(FeedError::invalid_payload("expected an array, got an object")),
        other => Err(FeedError::invalid_payload(format!(
            "expected an array, got {other}"
        ))),
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_listings(&self) -> Result<Vec<Listing>, FeedError> {
        debug!(url = %self.listings_url, "Fetching approved listings");

        let response = self
            .client
            .get(&self.listings_url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to reach listing endpoint");
                if e.is_timeout() {
                    FeedError::network("request timed out")
                } else if e.is_connect() {
                    FeedError::network("failed to connect to listing endpoint")
                } else {
                    FeedError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            warn!(error = %e, "Listing response is not JSON");
            FeedError::invalid_payload(format!("failed to parse response: {e}"))
        })?;

        let listings = parse_listing_payload(body)?;
        debug!(count = listings.len(), "Fetched approved listings");
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_client_creation() {
        let source = assert_ok!(HttpListingSource::new());
        assert_eq!(source.listings_url(), "http://localhost:5000/api/properties/approved");
    }

    #[test]
    fn test_join_url_handles_slashes() {
        assert_eq!(
            join_url("https://api.example.com/", "/api/properties/approved"),
            "https://api.example.com/api/properties/approved"
        );
        assert_eq!(join_url("https://api.example.com", "listings"), "https://api.example.com/listings");
    }

    #[test]
    fn test_parse_array_payload() {
        let listings = parse_listing_payload(json!([{ "id": 1 }, { "id": 2 }])).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[1].raw()["id"], 2);
    }

    #[test]
    fn test_parse_rejects_non_arrays() {
        assert!(assert_err!(parse_listing_payload(json!({ "data": [] }))).is_payload_error());
        assert!(parse_listing_payload(Value::Null).unwrap_err().is_payload_error());
        assert!(parse_listing_payload(json!("oops")).unwrap_err().is_payload_error());
    }

    #[test]
    fn test_empty_array_is_still_an_array() {
        assert!(parse_listing_payload(json!([])).unwrap().is_empty());
    }
}
