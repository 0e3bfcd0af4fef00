use crate::classification::FreshnessLevel;

/// Per-tier breakdown of active listings by freshness, the payload behind
/// `generate_freshness_report`, grounded on
/// `data_freshness_manager.py::get_update_statistics`'s distribution +
/// percentage shape.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FreshnessCounts {
    pub total: i64,
    pub real_time: i64,
    pub fresh: i64,
    pub recent: i64,
    pub stale: i64,
    pub expired: i64,
}

impl FreshnessCounts {
    pub fn count(&self, level: FreshnessLevel) -> i64 {
        match level {
            FreshnessLevel::RealTime => self.real_time,
            FreshnessLevel::Fresh => self.fresh,
            FreshnessLevel::Recent => self.recent,
            FreshnessLevel::Stale => self.stale,
            FreshnessLevel::Expired => self.expired,
        }
    }

    fn percentage(&self, count: i64) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (count as f64 / self.total as f64 * 100.0 * 10.0).round() / 10.0
        }
    }
}

/// Emitted every 6h by `generate_freshness_report`.
#[derive(Debug, Clone, PartialEq)]
pub struct FreshnessReport {
    pub total_active: i64,
    pub counts: FreshnessCounts,
    pub real_time_pct: f64,
    pub fresh_pct: f64,
    pub recent_pct: f64,
    pub stale_pct: f64,
    pub expired_pct: f64,
    pub recommendations: Vec<String>,
}

/// The expired-percentage threshold above which the report recommends
/// raising the refresh batch size.
const HIGH_EXPIRED_PCT: f64 = 20.0;
/// The real-time-percentage threshold below which the report recommends
/// shortening the `refresh_popular_vehicles` interval.
const LOW_REAL_TIME_PCT: f64 = 5.0;

impl FreshnessReport {
    pub fn from_counts(counts: FreshnessCounts) -> Self {
        let real_time_pct = counts.percentage(counts.real_time);
        let fresh_pct = counts.percentage(counts.fresh);
        let recent_pct = counts.percentage(counts.recent);
        let stale_pct = counts.percentage(counts.stale);
        let expired_pct = counts.percentage(counts.expired);

        let mut recommendations = Vec::new();
        if expired_pct > HIGH_EXPIRED_PCT {
            recommendations.push(format!(
                "{expired_pct}% of listings expired, consider raising batch size"
            ));
        }
        if real_time_pct < LOW_REAL_TIME_PCT && counts.total > 0 {
            recommendations.push(format!(
                "only {real_time_pct}% of listings are real-time fresh, consider shortening the \
                 refresh_popular_vehicles interval"
            ));
        }
        if counts.total == 0 {
            recommendations.push("no active listings to report on".to_string());
        }

        Self {
            total_active: counts.total,
            counts,
            real_time_pct,
            fresh_pct,
            recent_pct,
            stale_pct,
            expired_pct,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_sum_to_roughly_one_hundred() {
        let counts = FreshnessCounts {
            total: 100,
            real_time: 10,
            fresh: 20,
            recent: 30,
            stale: 15,
            expired: 25,
        };
        let report = FreshnessReport::from_counts(counts);
        let sum = report.real_time_pct + report.fresh_pct + report.recent_pct + report.stale_pct + report.expired_pct;
        assert!((sum - 100.0).abs() < 0.5);
    }

    #[test]
    fn high_expired_percentage_recommends_raising_batch_size() {
        let counts = FreshnessCounts {
            total: 100,
            expired: 30,
            ..Default::default()
        };
        let report = FreshnessReport::from_counts(counts);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("raising batch size")));
    }

    #[test]
    fn zero_total_does_not_divide_by_zero() {
        let report = FreshnessReport::from_counts(FreshnessCounts::default());
        assert_eq!(report.expired_pct, 0.0);
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn a_second_report_with_fewer_expired_shows_improvement() {
        let before = FreshnessReport::from_counts(FreshnessCounts {
            total: 100,
            expired: 25,
            ..Default::default()
        });
        let after = FreshnessReport::from_counts(FreshnessCounts {
            total: 100,
            expired: 10,
            real_time: 15,
            ..Default::default()
        });
        assert!(after.expired_pct < before.expired_pct);
    }
}
