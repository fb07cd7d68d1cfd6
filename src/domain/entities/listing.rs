//! Property listing records and the persisted feed snapshot.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default field holding the listing's creation timestamp.
pub const DEFAULT_CREATED_AT_FIELD: &str = "createdAt";
/// Default field holding the current image list.
pub const DEFAULT_IMAGES_FIELD: &str = "images";
/// Default field holding images written by older clients.
pub const DEFAULT_LEGACY_IMAGES_FIELD: &str = "image";

/// Names of the upstream fields this crate reads from a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingFields {
    /// Creation timestamp field.
    #[serde(default = "default_created_at")]
    pub created_at: String,
    /// New image field, takes precedence.
    #[serde(default = "default_images")]
    pub images: String,
    /// Legacy image field.
    #[serde(default = "default_legacy_images")]
    pub legacy_images: String,
}

fn default_created_at() -> String {
    DEFAULT_CREATED_AT_FIELD.to_string()
}

fn default_images() -> String {
    DEFAULT_IMAGES_FIELD.to_string()
}

fn default_legacy_images() -> String {
    DEFAULT_LEGACY_IMAGES_FIELD.to_string()
}

impl Default for ListingFields {
    fn default() -> Self {
        Self {
            created_at: default_created_at(),
            images: default_images(),
            legacy_images: default_legacy_images(),
        }
    }
}

/// One property record from the approved-listings feed.
///
/// The record is kept as raw JSON: only the creation time and the image
/// fields are ever interpreted, everything else passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Listing(Value);

impl Listing {
    /// Wraps a raw JSON record.
    #[must_use]
    pub const fn new(raw: Value) -> Self {
        Self(raw)
    }

    /// Returns the raw JSON record.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.0
    }

    /// Returns a top-level field, if present and not null.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// Creation timestamp, or `None` when missing or unparseable.
    #[must_use]
    pub fn created_at(&self, fields: &ListingFields) -> Option<DateTime<Utc>> {
        self.field(&fields.created_at).and_then(parse_timestamp)
    }

    /// Raw value of the new image field.
    #[must_use]
    pub fn images(&self, fields: &ListingFields) -> Option<&Value> {
        self.field(&fields.images)
    }

    /// Raw value of the legacy image field.
    #[must_use]
    pub fn legacy_images(&self, fields: &ListingFields) -> Option<&Value> {
        self.field(&fields.legacy_images)
    }
}

impl From<Value> for Listing {
    fn from(raw: Value) -> Self {
        Self::new(raw)
    }
}

/// Parses an upstream timestamp: RFC 3339 text or epoch milliseconds
/// (as a number or a numeric string).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            s.parse::<i64>().ok().and_then(from_millis)
        }
        Value::Number(n) => n
            .as_i64()
            // Whole-valued floats only; fractional millis are not a format upstream emits.
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(from_millis),
        _ => None,
    }
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Locally persisted copy of the full listing collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSnapshot {
    /// Listings exactly as returned by the network.
    pub data: Vec<Listing>,
    /// Capture time of the response that produced `data`, epoch millis.
    pub timestamp: i64,
}

impl ListingSnapshot {
    /// Creates a snapshot captured at `captured_at`.
    #[must_use]
    pub fn new(data: Vec<Listing>, captured_at: DateTime<Utc>) -> Self {
        Self {
            data,
            timestamp: captured_at.timestamp_millis(),
        }
    }

    /// Milliseconds elapsed since capture. Negative under clock skew.
    #[must_use]
    pub fn age_millis(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis() - self.timestamp
    }

    /// Returns true while the snapshot is younger than `ttl`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: std::time::Duration) -> bool {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.age_millis(now) < ttl_millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_created_at_rfc3339() {
        let listing = Listing::new(json!({ "createdAt": "2024-03-01T10:00:00Z" }));
        let created = listing.created_at(&ListingFields::default()).unwrap();
        assert_eq!(created.timestamp(), 1_709_287_200);
    }

    #[test]
    fn test_created_at_epoch_millis() {
        let listing = Listing::new(json!({ "createdAt": 1_709_287_200_000_i64 }));
        let created = listing.created_at(&ListingFields::default()).unwrap();
        assert_eq!(created.timestamp(), 1_709_287_200);

        let listing = Listing::new(json!({ "createdAt": "1709287200000" }));
        assert!(listing.created_at(&ListingFields::default()).is_some());
    }

    #[test]
    fn test_created_at_missing_or_garbage() {
        let fields = ListingFields::default();
        assert!(Listing::new(json!({})).created_at(&fields).is_none());
        assert!(Listing::new(json!({ "createdAt": null })).created_at(&fields).is_none());
        assert!(Listing::new(json!({ "createdAt": "yesterday" })).created_at(&fields).is_none());
        assert!(Listing::new(json!({ "createdAt": true })).created_at(&fields).is_none());
    }

    #[test]
    fn test_custom_field_names() {
        let fields = ListingFields {
            created_at: "postedOn".to_string(),
            images: "photos".to_string(),
            legacy_images: "photo".to_string(),
        };
        let listing = Listing::new(json!({
            "postedOn": "2024-03-01T10:00:00Z",
            "photos": ["https://a.com/1.jpg"],
        }));
        assert!(listing.created_at(&fields).is_some());
        assert!(listing.images(&fields).is_some());
        assert!(listing.legacy_images(&fields).is_none());
    }

    #[test]
    fn test_listing_round_trips_unknown_fields() {
        let raw = json!({ "title": "2BHK", "price": 4_500_000, "nested": { "a": [1, 2] } });
        let listing = Listing::new(raw.clone());
        let encoded = serde_json::to_string(&listing).unwrap();
        let decoded: Listing = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.raw(), &raw);
    }

    #[test]
    fn test_snapshot_freshness() {
        let now = Utc::now();
        let ttl = std::time::Duration::from_secs(24 * 3600);

        let fresh = ListingSnapshot::new(vec![], now - Duration::hours(23));
        assert!(fresh.is_fresh(now, ttl));

        let stale = ListingSnapshot::new(vec![], now - Duration::hours(25));
        assert!(!stale.is_fresh(now, ttl));

        let boundary = ListingSnapshot::new(vec![], now - Duration::hours(24));
        assert!(!boundary.is_fresh(now, ttl));
    }
}
