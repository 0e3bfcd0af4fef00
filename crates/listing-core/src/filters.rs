use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The structured filter set recognized by the search entry point.
/// Every field is optional; absence means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct FilterSet {
    pub make: Option<String>,
    pub model: Vec<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    /// Minor currency units, the same convention as `Listing::price`.
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    pub mileage_min: Option<i32>,
    pub mileage_max: Option<i32>,
    pub body_style: Option<String>,
    pub exterior_color: Vec<String>,
    pub exclude_colors: Vec<String>,
    pub transmission: Option<String>,
    pub drivetrain: Option<String>,
    pub fuel_type: Option<String>,
    pub required_features: Vec<String>,
    /// Open map of attribute-key -> minimum numeric value.
    pub attributes: BTreeMap<String, f64>,
    pub clean_title_only: bool,
    pub no_accidents: bool,
    pub one_owner_only: bool,
    pub certified_only: bool,
}

impl FilterSet {
    /// Merges `self` (caller-provided) over `other` (pre-processor-derived):
    /// caller-provided values always take precedence. Fields
    /// the caller left empty/default are filled from `other`.
    pub fn merge_over(mut self, other: FilterSet) -> FilterSet {
        self.make = self.make.or(other.make);
        if self.model.is_empty() {
            self.model = other.model;
        }
        self.year_min = self.year_min.or(other.year_min);
        self.year_max = self.year_max.or(other.year_max);
        self.price_min = self.price_min.or(other.price_min);
        self.price_max = self.price_max.or(other.price_max);
        self.mileage_min = self.mileage_min.or(other.mileage_min);
        self.mileage_max = self.mileage_max.or(other.mileage_max);
        self.body_style = self.body_style.or(other.body_style);
        if self.exterior_color.is_empty() {
            self.exterior_color = other.exterior_color;
        }
        if self.exclude_colors.is_empty() {
            self.exclude_colors = other.exclude_colors;
        }
        self.transmission = self.transmission.or(other.transmission);
        self.drivetrain = self.drivetrain.or(other.drivetrain);
        self.fuel_type = self.fuel_type.or(other.fuel_type);
        if self.required_features.is_empty() {
            self.required_features = other.required_features;
        }
        for (key, value) in other.attributes {
            self.attributes.entry(key).or_insert(value);
        }
        self.clean_title_only |= other.clean_title_only;
        self.no_accidents |= other.no_accidents;
        self.one_owner_only |= other.one_owner_only;
        self.certified_only |= other.certified_only;
        self
    }

    /// Validates the `year` bounds: `[1900, current_year +
    /// 2]`, rejected (not clamped) outside that range.
    pub fn validate_year_bounds(&self, current_year: i32) -> Result<(), String> {
        let max_allowed = current_year + 2;
        for bound in [self.year_min, self.year_max].into_iter().flatten() {
            if !(1900..=max_allowed).contains(&bound) {
                return Err(format!(
                    "year filter {bound} out of range [1900, {max_allowed}]"
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.year_min, self.year_max) {
            if min > max {
                return Err(format!("year_min {min} is greater than year_max {max}"));
            }
        }
        Ok(())
    }

    /// A color present in both `exterior_color` and
    /// `exclude_colors` means exclusion wins — the filter can never match.
    pub fn is_unsatisfiable(&self) -> bool {
        if self.exterior_color.is_empty() || self.exclude_colors.is_empty() {
            return false;
        }
        self.exterior_color.iter().all(|color| {
            self.exclude_colors
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(color))
        })
    }
}

/// Clamps `per_page` into `[1, 100]`, returning whether a
/// clamp occurred so it can be recorded in `applied_filters`.
pub fn clamp_per_page(per_page: i64) -> (i64, bool) {
    let clamped = per_page.clamp(1, 100);
    (clamped, clamped != per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_over_prefers_caller_values() {
        let caller = FilterSet {
            make: Some("Honda".into()),
            ..Default::default()
        };
        let derived = FilterSet {
            make: Some("Toyota".into()),
            year_min: Some(1992),
            ..Default::default()
        };
        let merged = caller.merge_over(derived);
        assert_eq!(merged.make.as_deref(), Some("Honda"));
        assert_eq!(merged.year_min, Some(1992));
    }

    #[test]
    fn exclude_wins_when_colors_overlap() {
        let filters = FilterSet {
            exterior_color: vec!["Red".into()],
            exclude_colors: vec!["red".into()],
            ..Default::default()
        };
        assert!(filters.is_unsatisfiable());
    }

    #[test]
    fn clamp_per_page_corrects_out_of_range() {
        assert_eq!(clamp_per_page(200), (100, true));
        assert_eq!(clamp_per_page(0), (1, true));
        assert_eq!(clamp_per_page(20), (20, false));
    }

    #[test]
    fn year_bounds_reject_outside_range() {
        let filters = FilterSet {
            year_min: Some(1899),
            ..Default::default()
        };
        assert!(filters.validate_year_bounds(2026).is_err());
    }
}
