//! Freshness categories derived from listing age.

use serde::{Deserialize, Serialize};

use super::Listing;

/// Age band a listing falls into. Recomputed on every read, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessTag {
    /// Up to 3 days old (and anything dated in the future).
    Regular,
    /// 4 to 17 days old.
    Approved,
    /// 18 to 25 days old.
    Wealth,
    /// Older than 25 days, or undated.
    Listed,
}

impl FreshnessTag {
    /// All tags in band order.
    pub const ALL: [Self; 4] = [Self::Regular, Self::Approved, Self::Wealth, Self::Listed];

    /// Maps whole elapsed days to a band.
    #[must_use]
    pub const fn from_age_days(days: i64) -> Self {
        match days {
            i64::MIN..=3 => Self::Regular,
            4..=17 => Self::Approved,
            18..=25 => Self::Wealth,
            _ => Self::Listed,
        }
    }

    /// Stable lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Approved => "approved",
            Self::Wealth => "wealth",
            Self::Listed => "listed",
        }
    }
}

impl std::fmt::Display for FreshnessTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Listings partitioned by freshness, original order kept within each bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedListings {
    /// `Regular` listings.
    pub regular: Vec<Listing>,
    /// `Approved` listings.
    pub approved: Vec<Listing>,
    /// `Wealth` listings.
    pub wealth: Vec<Listing>,
    /// `Listed` listings.
    pub listed: Vec<Listing>,
}

impl CategorizedListings {
    /// Appends a listing to the bucket for `tag`.
    pub fn push(&mut self, tag: FreshnessTag, listing: Listing) {
        self.bucket_mut(tag).push(listing);
    }

    /// Returns the bucket for `tag`.
    #[must_use]
    pub fn bucket(&self, tag: FreshnessTag) -> &[Listing] {
        match tag {
            FreshnessTag::Regular => &self.regular,
            FreshnessTag::Approved => &self.approved,
            FreshnessTag::Wealth => &self.wealth,
            FreshnessTag::Listed => &self.listed,
        }
    }

    fn bucket_mut(&mut self, tag: FreshnessTag) -> &mut Vec<Listing> {
        match tag {
            FreshnessTag::Regular => &mut self.regular,
            FreshnessTag::Approved => &mut self.approved,
            FreshnessTag::Wealth => &mut self.wealth,
            FreshnessTag::Listed => &mut self.listed,
        }
    }

    /// Total number of listings across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regular.len() + self.approved.len() + self.wealth.len() + self.listed.len()
    }

    /// Returns true if every bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
