//! Freshness Manager and Background Refresh Scheduler.
//!
//! `classification`/`policy`/`priority` are pure decision logic; `access`
//! tracks per-listing lookup counts that feed the priority formula;
//! `report` turns a per-tier count into the human-facing freshness report;
//! `scheduler` drives the four periodic jobs that keep the local index
//! warm.

pub mod access;
pub mod classification;
pub mod policy;
pub mod priority;
pub mod report;
pub mod scheduler;

pub use {
    access::AccessTracker,
    classification::{classify, FreshnessLevel},
    policy::{should_refresh, Attribute},
    priority::{prioritize, priority_score, RefreshCandidate},
    report::{FreshnessCounts, FreshnessReport},
    scheduler::{BackgroundRefreshScheduler, SchedulerConfig},
};

use {
    chrono::{DateTime, Utc},
    listing_core::Listing,
    std::sync::Arc,
};

/// Combines `access` + `classification` + `policy` into the single question
/// the Aggregator Orchestrator asks at step 5 of `Search`: is the local
/// index's view of this listing fresh enough to skip live dispatch?
pub struct FreshnessManager {
    access: Arc<AccessTracker>,
}

impl FreshnessManager {
    pub fn new(access: Arc<AccessTracker>) -> Self {
        Self { access }
    }

    /// Records a lookup against the listing and returns its freshness tier.
    pub fn observe(&self, listing: &Listing, now: DateTime<Utc>) -> FreshnessLevel {
        self.access.record(&listing.id);
        classify(Some(listing.last_seen_at), now)
    }

    /// Whether the given attribute of this listing is stale enough that a
    /// live refresh should be preferred over the cached local-index value.
    pub fn attribute_is_stale(&self, listing: &Listing, attribute: Attribute, now: DateTime<Utc>) -> bool {
        should_refresh(attribute, classify(Some(listing.last_seen_at), now))
    }

    pub fn access_tracker(&self) -> &AccessTracker {
        &self.access
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn listing(last_seen_offset: Duration) -> Listing {
        let now = Utc::now();
        Listing {
            id: "l1".to_string(),
            source: "api_a".to_string(),
            source_listing_id: "1".to_string(),
            title: "2020 Honda Civic".to_string(),
            make: "Honda".to_string(),
            model: "Civic".to_string(),
            year: 2020,
            trim: None,
            price: None,
            mileage: None,
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
            last_seen_at: now - last_seen_offset,
            active: true,
            relevance_score: None,
        }
    }

    #[test]
    fn observe_records_access_and_classifies() {
        let manager = FreshnessManager::new(Arc::new(AccessTracker::new()));
        let listing = listing(Duration::zero());
        let level = manager.observe(&listing, Utc::now());
        assert_eq!(level, FreshnessLevel::RealTime);
        assert_eq!(manager.access_tracker().count("l1"), 1);
    }

    #[test]
    fn attribute_is_stale_follows_the_hybrid_policy() {
        let manager = FreshnessManager::new(Arc::new(AccessTracker::new()));
        let recent = listing(Duration::hours(12));
        let now = Utc::now();
        assert!(manager.attribute_is_stale(&recent, Attribute::Price, now));
        assert!(!manager.attribute_is_stale(&recent, Attribute::Mileage, now));
    }
}
