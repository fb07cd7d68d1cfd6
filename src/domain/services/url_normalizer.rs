//! Repair of image URLs coming from the listing feed.
//!
//! The feed stores image fields without a schema: the same field may hold a
//! single string or an array, and older records carry a CDN host glued in
//! front of a full URL. Every consumer goes through [`normalize`] so the
//! preloader and the display path always agree on the URL list.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use serde_json::Value;

use crate::domain::entities::{Listing, ListingFields};

const HTTP: &str = "http://";
const HTTPS: &str = "https://";

#[allow(clippy::expect_used)]
static BARE_HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w-]+(?:\.[\w-]+)*\.[\w-]{2,}(?:[/:?#]|$)").expect("valid bare host regex")
});

#[allow(clippy::expect_used)]
static REPEATED_SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)+(https?://)").expect("valid repeated scheme regex")
});

/// Normalizes a raw image field: a string, an array of strings, or null.
/// Non-string array elements and unrepairable entries are dropped.
#[must_use]
pub fn normalize(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::String(s)) => normalize_one(s).into_iter().collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(normalize_one)
            .collect(),
        _ => Vec::new(),
    }
}

/// Normalizes a list of raw strings, keeping order and duplicates.
#[must_use]
pub fn normalize_all<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter().filter_map(|s| normalize_one(s.as_ref())).collect()
}

/// All image URLs of a listing: the new field first, then the legacy one.
#[must_use]
pub fn normalize_listing_images(listing: &Listing, fields: &ListingFields) -> Vec<String> {
    let mut urls = normalize(listing.images(fields));
    urls.extend(normalize(listing.legacy_images(fields)));
    urls
}

/// Repairs one raw entry, or returns `None` if it is not a usable URL.
#[must_use]
pub fn normalize_one(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = match last_scheme_marker(trimmed) {
        Some(idx) if idx > 0 => trimmed[idx..].to_string(),
        Some(_) => trimmed.to_string(),
        None if !trimmed.contains("://") && BARE_HOST_RE.is_match(trimmed) => {
            format!("{HTTPS}{trimmed}")
        }
        None => trimmed.to_string(),
    };

    let candidate = REPEATED_SCHEME_RE.replace(&candidate, "$1").into_owned();

    is_valid_absolute(&candidate).then_some(candidate)
}

fn last_scheme_marker(s: &str) -> Option<usize> {
    match (s.rfind(HTTP), s.rfind(HTTPS)) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn is_valid_absolute(candidate: &str) -> bool {
    Url::parse(candidate).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
    })
}
