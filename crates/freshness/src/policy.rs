use crate::classification::FreshnessLevel;

/// A data attribute whose volatility governs how aggressively it should be
/// refreshed (grounded on `data_freshness_manager.py::UPDATE_PRIORITIES`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Price,
    Availability,
    Mileage,
    Description,
    Features,
}

impl Attribute {
    fn volatility(self) -> Volatility {
        match self {
            Attribute::Price | Attribute::Availability => Volatility::High,
            Attribute::Mileage => Volatility::Medium,
            Attribute::Description | Attribute::Features => Volatility::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Volatility {
    High,
    Medium,
    Low,
}

/// The hybrid refresh-decision policy: always refresh
/// expired data; high-volatility attributes refresh once data falls below
/// `fresh`; medium-volatility attributes wait until `stale` or worse;
/// low-volatility attributes only refresh once `expired`.
pub fn should_refresh(attribute: Attribute, freshness: FreshnessLevel) -> bool {
    if freshness == FreshnessLevel::Expired {
        return true;
    }

    match attribute.volatility() {
        Volatility::High => !matches!(freshness, FreshnessLevel::RealTime | FreshnessLevel::Fresh),
        Volatility::Medium => matches!(freshness, FreshnessLevel::Stale),
        Volatility::Low => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_always_refreshes() {
        for attribute in [
            Attribute::Price,
            Attribute::Availability,
            Attribute::Mileage,
            Attribute::Description,
            Attribute::Features,
        ] {
            assert!(should_refresh(attribute, FreshnessLevel::Expired));
        }
    }

    #[test]
    fn high_volatility_refreshes_once_past_fresh() {
        assert!(!should_refresh(Attribute::Price, FreshnessLevel::RealTime));
        assert!(!should_refresh(Attribute::Price, FreshnessLevel::Fresh));
        assert!(should_refresh(Attribute::Price, FreshnessLevel::Recent));
        assert!(should_refresh(Attribute::Availability, FreshnessLevel::Stale));
    }

    #[test]
    fn medium_volatility_refreshes_only_when_stale() {
        assert!(!should_refresh(Attribute::Mileage, FreshnessLevel::Recent));
        assert!(should_refresh(Attribute::Mileage, FreshnessLevel::Stale));
    }

    #[test]
    fn low_volatility_refreshes_only_when_expired() {
        assert!(!should_refresh(Attribute::Description, FreshnessLevel::Stale));
        assert!(!should_refresh(Attribute::Features, FreshnessLevel::Stale));
    }
}
