use listing_core::SourceKind;

/// One candidate for the next refresh batch.
#[derive(Debug, Clone)]
pub struct RefreshCandidate {
    pub listing_id: String,
    pub source_kind: SourceKind,
    pub age_days: f64,
    pub access_count: u64,
}

/// `score = min(age_days*10, 100) * source_weight + min(access_count*5, 50)`
/// (grounded on `data_freshness_manager.py::calculate_priority_score`).
/// Source weights come from [`SourceKind::freshness_weight`].
pub fn priority_score(candidate: &RefreshCandidate) -> f64 {
    let age_component = (candidate.age_days * 10.0).min(100.0);
    let popularity_component = ((candidate.access_count as f64) * 5.0).min(50.0);
    age_component * candidate.source_kind.freshness_weight() + popularity_component
}

/// Sorts candidates by descending priority score and takes the top `batch_size`.
pub fn prioritize(mut candidates: Vec<RefreshCandidate>, batch_size: usize) -> Vec<RefreshCandidate> {
    candidates.sort_by(|a, b| {
        priority_score(b)
            .partial_cmp(&priority_score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(batch_size);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, kind: SourceKind, age_days: f64, access_count: u64) -> RefreshCandidate {
        RefreshCandidate {
            listing_id: id.to_string(),
            source_kind: kind,
            age_days,
            access_count,
        }
    }

    #[test]
    fn older_listings_score_higher_all_else_equal() {
        let older = candidate("1", SourceKind::Api, 5.0, 0);
        let newer = candidate("2", SourceKind::Api, 1.0, 0);
        assert!(priority_score(&older) > priority_score(&newer));
    }

    #[test]
    fn age_component_caps_at_100() {
        let very_old = candidate("1", SourceKind::Local, 50.0, 0);
        let capped = priority_score(&very_old);
        assert_eq!(capped, 100.0 * SourceKind::Local.freshness_weight());
    }

    #[test]
    fn popularity_component_caps_at_50() {
        let popular = candidate("1", SourceKind::Local, 0.0, 1000);
        assert_eq!(priority_score(&popular), 50.0);
    }

    #[test]
    fn api_source_outranks_scrape_source_all_else_equal() {
        let api = candidate("1", SourceKind::Api, 2.0, 0);
        let scrape = candidate("2", SourceKind::Scrape, 2.0, 0);
        assert!(priority_score(&api) > priority_score(&scrape));
    }

    #[test]
    fn prioritize_truncates_to_batch_size_in_descending_order() {
        let candidates = vec![
            candidate("low", SourceKind::Local, 1.0, 0),
            candidate("high", SourceKind::Api, 10.0, 0),
            candidate("mid", SourceKind::Feed, 5.0, 0),
        ];
        let top = prioritize(candidates, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].listing_id, "high");
        assert_eq!(top[1].listing_id, "mid");
    }
}
