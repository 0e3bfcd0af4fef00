use dashmap::DashMap;

/// Tracks how often a listing is looked up, feeding the "popular vehicle"
/// term of the refresh priority formula (grounded on
/// `data_freshness_manager.py::track_data_access`). In-process only: no TTL
/// eviction, matching the tiered cache's in-process-only tiers.
#[derive(Default)]
pub struct AccessTracker {
    counts: DashMap<String, u64>,
}

impl AccessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, listing_id: &str) {
        *self.counts.entry(listing_id.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, listing_id: &str) -> u64 {
        self.counts.get(listing_id).map(|entry| *entry).unwrap_or(0)
    }

    /// The `n` most-accessed listing ids, descending, for
    /// `refresh_popular_vehicles`.
    pub fn top_n(&self, n: usize) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_per_listing() {
        let tracker = AccessTracker::new();
        tracker.record("a");
        tracker.record("a");
        tracker.record("b");
        assert_eq!(tracker.count("a"), 2);
        assert_eq!(tracker.count("b"), 1);
        assert_eq!(tracker.count("unseen"), 0);
    }

    #[test]
    fn top_n_orders_descending_and_truncates() {
        let tracker = AccessTracker::new();
        for _ in 0..5 {
            tracker.record("popular");
        }
        for _ in 0..2 {
            tracker.record("medium");
        }
        tracker.record("rare");
        let top = tracker.top_n(2);
        assert_eq!(top, vec![("popular".to_string(), 5), ("medium".to_string(), 2)]);
    }
}
