use {
    crate::adapter::{HealthProbe, HealthStatus, SourceAdapter, SourceMeta},
    async_trait::async_trait,
    chrono::Utc,
    listing_core::{ErrorKind, FilterSet, Listing, SearchError, SourceKind},
    rand::{rngs::StdRng, Rng, SeedableRng},
    std::time::Instant,
};

const MAKES_MODELS: &[(&str, &str)] = &[
    ("Honda", "Civic"),
    ("Toyota", "Camry"),
    ("Ford", "F150"),
    ("BMW", "3 Series"),
    ("Mercedes", "C Class"),
];

/// Synthesizes deterministic sample listings, tagged `source = "sample"`.
///
/// Never included in `enabled_sources` unless
/// `ENABLE_SEEDED_SOURCE=true` is set, and the Deduplicator never treats a
/// sample listing as a winner over a live one regardless of completeness
/// (enforced in `dedup_score`, not here — this adapter only tags its
/// output).
pub struct SeededAdapter {
    count: usize,
}

impl SeededAdapter {
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

fn seed_for(query: &str) -> u64 {
    query.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
}

#[async_trait]
impl SourceAdapter for SeededAdapter {
    fn tag(&self) -> &str {
        "sample"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Seeded
    }

    async fn search(
        &self,
        query: &str,
        _filters: &FilterSet,
        _page: i64,
        _per_page: i64,
        _deadline: Instant,
    ) -> Result<(Vec<Listing>, SourceMeta), SearchError> {
        let mut rng = StdRng::seed_from_u64(seed_for(query));
        let now = Utc::now();
        let listings = (0..self.count)
            .map(|i| {
                let (make, model) = MAKES_MODELS[i % MAKES_MODELS.len()];
                let source_listing_id = format!("seed-{i}");
                Listing {
                    id: Listing::derive_id("sample", &source_listing_id),
                    source: "sample".to_string(),
                    source_listing_id,
                    title: format!("{} {} {}", 2018 + (i as i32 % 8), make, model),
                    make: make.to_string(),
                    model: model.to_string(),
                    year: 2018 + (i as i32 % 8),
                    trim: None,
                    price: Some(rng.gen_range(5_000_00..45_000_00)),
                    mileage: Some(rng.gen_range(1_000..120_000)),
                    body_style: None,
                    exterior_color: None,
                    transmission: None,
                    drivetrain: None,
                    fuel_type: None,
                    vin: None,
                    location: None,
                    zip_code: None,
                    dealer_name: Some("Sample Motors".to_string()),
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
            })
            .collect();
        Ok((
            listings,
            SourceMeta {
                total_claimed: Some(self.count as i64),
                truncated: false,
            },
        ))
    }

    async fn get_details(&self, source_listing_id: &str, _deadline: Instant) -> Result<Listing, SearchError> {
        Err(SearchError::new(
            ErrorKind::NotFound,
            format!("sample source has no persisted record for {source_listing_id}"),
        ))
    }

    async fn health(&self, _deadline: Instant) -> HealthProbe {
        HealthProbe {
            status: HealthStatus::Healthy,
            message: "synthetic source, no external dependency".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listing_core::FilterSet;

    #[tokio::test]
    async fn search_is_deterministic_for_the_same_query() {
        let adapter = SeededAdapter::new(5);
        let deadline = Instant::now() + std::time::Duration::from_secs(1);
        let (first, _) = adapter
            .search("honda civic", &FilterSet::default(), 1, 10, deadline)
            .await
            .unwrap();
        let (second, _) = adapter
            .search("honda civic", &FilterSet::default(), 1, 10, deadline)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn every_listing_is_tagged_sample() {
        let adapter = SeededAdapter::new(3);
        let deadline = Instant::now() + std::time::Duration::from_secs(1);
        let (listings, _) = adapter
            .search("toyota camry", &FilterSet::default(), 1, 10, deadline)
            .await
            .unwrap();
        assert!(listings.iter().all(|l| l.source == "sample"));
    }
}
