use chrono::{DateTime, Duration, Utc};

/// Freshness tier of an active listing, by age of `last_seen_at`
/// (grounded on `findmycar/data_freshness_manager.py::FreshnessLevel`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FreshnessLevel {
    RealTime,
    Fresh,
    Recent,
    Stale,
    Expired,
}

impl FreshnessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FreshnessLevel::RealTime => "real_time",
            FreshnessLevel::Fresh => "fresh",
            FreshnessLevel::Recent => "recent",
            FreshnessLevel::Stale => "stale",
            FreshnessLevel::Expired => "expired",
        }
    }
}

/// Classifies a listing's freshness from its last-seen timestamp. A listing
/// that was never seen (`None`) is always `Expired`.
pub fn classify(last_seen_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> FreshnessLevel {
    let Some(last_seen_at) = last_seen_at else {
        return FreshnessLevel::Expired;
    };
    let age = now.signed_duration_since(last_seen_at);

    if age <= Duration::minutes(5) {
        FreshnessLevel::RealTime
    } else if age <= Duration::hours(1) {
        FreshnessLevel::Fresh
    } else if age <= Duration::hours(24) {
        FreshnessLevel::Recent
    } else if age <= Duration::days(7) {
        FreshnessLevel::Stale
    } else {
        FreshnessLevel::Expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_each_threshold_boundary() {
        let now = Utc::now();
        assert_eq!(classify(Some(now), now), FreshnessLevel::RealTime);
        assert_eq!(classify(Some(now - Duration::minutes(30)), now), FreshnessLevel::Fresh);
        assert_eq!(classify(Some(now - Duration::hours(12)), now), FreshnessLevel::Recent);
        assert_eq!(classify(Some(now - Duration::days(3)), now), FreshnessLevel::Stale);
        assert_eq!(classify(Some(now - Duration::days(8)), now), FreshnessLevel::Expired);
    }

    #[test]
    fn missing_last_seen_is_expired() {
        assert_eq!(classify(None, Utc::now()), FreshnessLevel::Expired);
    }
}
