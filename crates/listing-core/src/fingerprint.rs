use crate::listing::Listing;

/// Bucket width for price, in minor currency units, used by the non-VIN
/// fingerprint so near-identical prices across sources collapse to the same
/// bucket. $500, chosen so cross-source rounding/fee differences on the same
/// vehicle don't split its fingerprint.
const PRICE_BUCKET: i64 = 50_000;
/// Bucket width for mileage, in miles, for the same reason.
const MILEAGE_BUCKET: i32 = 1_000;

/// Cross-source deduplication identity. VIN-based keys
/// collapse the same vehicle seen on multiple sources into one group;
/// non-VIN keys never collapse across sources, since only a VIN is a
/// reliable enough signal to merge listings two different dealers posted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FingerprintKey {
    Vin(String),
    Heuristic {
        year: i32,
        make: String,
        model: String,
        price_bucket: i64,
        mileage_bucket: i32,
        source: String,
    },
}

impl FingerprintKey {
    pub fn for_listing(listing: &Listing) -> Self {
        if let Some(vin) = listing.vin.as_deref().filter(|vin| !vin.is_empty()) {
            return FingerprintKey::Vin(vin.to_ascii_uppercase());
        }
        let price_bucket = listing.price.map(|p| p / PRICE_BUCKET).unwrap_or(-1);
        let mileage_bucket = listing
            .mileage
            .map(|m| m / MILEAGE_BUCKET)
            .unwrap_or(-1);
        FingerprintKey::Heuristic {
            year: listing.year,
            make: listing.make.to_lowercase(),
            model: listing.model.to_lowercase(),
            price_bucket,
            mileage_bucket,
            source: listing.source.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn listing(source: &str, vin: Option<&str>, price: Option<i64>) -> Listing {
        let now = Utc::now();
        Listing {
            id: Listing::derive_id(source, "1"),
            source: source.into(),
            source_listing_id: "1".into(),
            title: String::new(),
            make: "Honda".into(),
            model: "Civic".into(),
            year: 2020,
            trim: None,
            price,
            mileage: Some(10_000),
            body_style: None,
            exterior_color: None,
            transmission: None,
            drivetrain: None,
            fuel_type: None,
            vin: vin.map(Into::into),
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
    fn vin_keys_collapse_across_sources() {
        let a = listing("api_a", Some("1HGEG1150NL000001"), Some(9_500_00));
        let b = listing("scrape_b", Some("1hgeg1150nl000001"), None);
        assert_eq!(FingerprintKey::for_listing(&a), FingerprintKey::for_listing(&b));
    }

    #[test]
    fn non_vin_keys_never_collapse_across_sources() {
        let a = listing("api_a", None, Some(9_500_00));
        let b = listing("scrape_b", None, Some(9_500_00));
        assert_ne!(FingerprintKey::for_listing(&a), FingerprintKey::for_listing(&b));
    }
}
