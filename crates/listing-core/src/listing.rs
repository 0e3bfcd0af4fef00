use {
    crate::error::SearchError,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
    std::collections::{BTreeMap, BTreeSet},
};

/// A normalized vehicle record, the one shape every adapter must produce
/// regardless of upstream.
///
/// `id` is derived from `(source, source_listing_id)` and never changes for
/// that pair, even across refreshes. Core columns are closed; anything
/// adapter-specific belongs in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub source: String,
    pub source_listing_id: String,
    pub title: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub trim: Option<String>,
    /// Minor currency units (cents), never negative.
    pub price: Option<i64>,
    pub mileage: Option<i32>,
    pub body_style: Option<String>,
    pub exterior_color: Option<String>,
    pub transmission: Option<String>,
    pub drivetrain: Option<String>,
    pub fuel_type: Option<String>,
    pub vin: Option<String>,
    pub location: Option<String>,
    pub zip_code: Option<String>,
    pub dealer_name: Option<String>,
    pub listing_url: Option<String>,
    pub image_urls: Vec<String>,
    pub description: Option<String>,
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub features: BTreeSet<String>,
    pub history: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub active: bool,
    /// Transient, computed by the relevance scorer; never persisted.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub relevance_score: Option<i64>,
}

impl Listing {
    /// Derives the stable synthetic id for a `(source, source_listing_id)`
    /// pair. Deterministic: the same pair always yields the same id.
    pub fn derive_id(source: &str, source_listing_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update(b"\0");
        hasher.update(source_listing_id.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Validates core invariants: year range, non-negative price/mileage,
    /// last_seen_at not before created_at. Called by adapters and the
    /// local index before a record is accepted.
    pub fn validate(&self, current_year: i32) -> Result<(), SearchError> {
        if self.year < 1900 || self.year > current_year + 2 {
            return Err(SearchError::validation(format!(
                "year {} out of range [1900, {}]",
                self.year,
                current_year + 2
            )));
        }
        if let Some(price) = self.price {
            if price < 0 {
                return Err(SearchError::validation("price must be >= 0"));
            }
        }
        if let Some(mileage) = self.mileage {
            if mileage < 0 {
                return Err(SearchError::validation("mileage must be >= 0"));
            }
        }
        if self.last_seen_at < self.created_at {
            return Err(SearchError::validation(
                "last_seen_at must be >= created_at",
            ));
        }
        if self.id != Self::derive_id(&self.source, &self.source_listing_id) {
            return Err(SearchError::validation(
                "id does not match derive_id(source, source_listing_id)",
            ));
        }
        Ok(())
    }

    /// Count of non-null core fields, used by the deduplicator's
    /// "more complete" winner-selection rule.
    pub fn completeness(&self) -> usize {
        let mut count = 0;
        if self.trim.is_some() {
            count += 1;
        }
        if self.price.is_some() {
            count += 1;
        }
        if self.mileage.is_some() {
            count += 1;
        }
        if self.body_style.is_some() {
            count += 1;
        }
        if self.exterior_color.is_some() {
            count += 1;
        }
        if self.transmission.is_some() {
            count += 1;
        }
        if self.drivetrain.is_some() {
            count += 1;
        }
        if self.fuel_type.is_some() {
            count += 1;
        }
        if self.vin.is_some() {
            count += 1;
        }
        if self.location.is_some() {
            count += 1;
        }
        if self.dealer_name.is_some() {
            count += 1;
        }
        if !self.image_urls.is_empty() {
            count += 1;
        }
        if self.description.is_some() {
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Listing {
        let now = Utc::now();
        Listing {
            id: Listing::derive_id("api_a", "123"),
            source: "api_a".into(),
            source_listing_id: "123".into(),
            title: "2020 Honda Civic".into(),
            make: "Honda".into(),
            model: "Civic".into(),
            year: 2020,
            trim: None,
            price: Some(22_000_00),
            mileage: Some(15_000),
            body_style: None,
            exterior_color: None,
            transmission: None,
            drivetrain: None,
            fuel_type: None,
            vin: None,
            location: None,
            zip_code: None,
            dealer_name: None,
            listing_url: None,
            image_urls: vec![],
            description: None,
            attributes: Default::default(),
            features: Default::default(),
            history: Default::default(),
            created_at: now,
            updated_at: now,
            last_seen_at: now,
            active: true,
            relevance_score: None,
        }
    }

    #[test]
    fn derive_id_is_deterministic() {
        assert_eq!(
            Listing::derive_id("api_a", "123"),
            Listing::derive_id("api_a", "123")
        );
        assert_ne!(
            Listing::derive_id("api_a", "123"),
            Listing::derive_id("api_b", "123")
        );
    }

    #[test]
    fn validate_rejects_bad_year() {
        let mut listing = sample();
        listing.year = 1899;
        assert!(listing.validate(2026).is_err());
        listing.year = 2030;
        assert!(listing.validate(2026).is_err());
    }

    #[test]
    fn validate_rejects_negative_price_and_mileage() {
        let mut listing = sample();
        listing.price = Some(-1);
        assert!(listing.validate(2026).is_err());
        listing.price = Some(0);
        listing.mileage = Some(-1);
        assert!(listing.validate(2026).is_err());
    }

    #[test]
    fn validate_rejects_last_seen_before_created() {
        let mut listing = sample();
        listing.last_seen_at = listing.created_at - chrono::Duration::seconds(1);
        assert!(listing.validate(2026).is_err());
    }

    #[test]
    fn validate_rejects_mismatched_id() {
        let mut listing = sample();
        listing.id = "not-the-derived-id".into();
        assert!(listing.validate(2026).is_err());
    }

    #[test]
    fn completeness_counts_non_null_core_fields() {
        let listing = sample();
        // price + mileage are set.
        assert_eq!(listing.completeness(), 2);
    }
}
