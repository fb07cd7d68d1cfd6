//! Freshness tagging of listings by age.

use chrono::{DateTime, Utc};

use crate::domain::entities::{CategorizedListings, FreshnessTag, Listing, ListingFields};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Whole days between `created_at` and `now`, floored.
#[must_use]
pub fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

/// Tags a creation time relative to `now`. A missing time is `Listed`;
/// a time in the future counts as `Regular`.
#[must_use]
pub fn tag_at(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> FreshnessTag {
    created_at.map_or(FreshnessTag::Listed, |created| {
        FreshnessTag::from_age_days(age_days(created, now))
    })
}

/// Tags a creation time against the wall clock.
#[must_use]
pub fn tag(created_at: Option<DateTime<Utc>>) -> FreshnessTag {
    tag_at(created_at, Utc::now())
}

/// Tags one listing.
#[must_use]
pub fn tag_listing(listing: &Listing, fields: &ListingFields, now: DateTime<Utc>) -> FreshnessTag {
    tag_at(listing.created_at(fields), now)
}

/// Partitions listings into freshness buckets, keeping input order.
#[must_use]
pub fn categorize(
    listings: Vec<Listing>,
    fields: &ListingFields,
    now: DateTime<Utc>,
) -> CategorizedListings {
    let mut categorized = CategorizedListings::default();
    for listing in listings {
        let tag = tag_listing(&listing, fields, now);
        categorized.push(tag, listing);
    }
    categorized
}
