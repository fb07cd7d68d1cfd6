//! REST client for the brokerage backend's listing feed.

mod client;

pub use client::{
    DEFAULT_API_BASE, DEFAULT_LISTINGS_PATH, DEFAULT_TIMEOUT_SECS, HttpListingSource,
    parse_listing_payload,
};
