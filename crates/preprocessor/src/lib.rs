//! Query Pre-processor: maps a free-form query string to
//! structured filters and a residual query string.
//!
//! Sub-steps, applied in order: chassis-code recognition, brand/model
//! keyword recognition, year extraction, price/mileage hint parsing.
//! Recognized tokens are removed from the residual query. The derived
//! `FilterSet` is meant to be combined with caller-provided filters via
//! `FilterSet::merge_over`, with caller values taking precedence.

mod chassis_codes;
mod hints;
mod keywords;

pub use chassis_codes::{ChassisCodeEntry, CHASSIS_CODES};

use listing_core::FilterSet;

/// Result of pre-processing a free-form query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreprocessResult {
    /// Filters derived from recognized tokens in the query.
    pub filters: FilterSet,
    /// The query with every recognized token's text removed, whitespace
    /// collapsed and trimmed.
    pub residual_query: String,
    /// Set when a chassis code was recognized, for callers that want to
    /// surface the matched variant/year-range to the user.
    pub chassis_code: Option<&'static ChassisCodeEntry>,
}

fn remove_spans(query: &str, mut spans: Vec<(usize, usize)>) -> String {
    spans.sort_unstable();
    let mut residual = String::with_capacity(query.len());
    let mut cursor = 0;
    for (start, end) in spans {
        if start < cursor {
            continue;
        }
        residual.push_str(&query[cursor..start]);
        cursor = end;
    }
    residual.push_str(&query[cursor..]);
    residual.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Runs every sub-step and returns the derived filters plus residual query.
/// `current_year` bounds year extraction and should
/// come from the caller's clock (`chrono::Utc::now().year()`), not computed
/// here, so the function stays deterministic and testable.
pub fn preprocess(query: &str, current_year: i32) -> PreprocessResult {
    let mut filters = FilterSet::default();
    let mut spans = Vec::new();
    let mut chassis_code = None;

    let upper = query.to_uppercase();
    if let Some(entry) = chassis_codes::recognize(&upper) {
        if let Some(offset) = upper.find(entry.code) {
            spans.push((offset, offset + entry.code.len()));
        }
        filters.make = Some(entry.make.to_string());
        filters.model = vec![entry.model.to_string()];
        filters.year_min = Some(entry.year_min);
        filters.year_max = Some(entry.year_max);
        chassis_code = Some(entry);
    } else if let Some(found) = keywords::recognize(query) {
        filters.make = Some(found.make);
        if let Some(model) = found.model {
            filters.model = vec![model];
        }
        spans.extend(found.spans);
    }

    if let Some(hint) = hints::extract_year(query, current_year) {
        filters.year_min = filters.year_min.or(Some(hint.value));
        filters.year_max = filters.year_max.or(Some(hint.value));
        spans.push(hint.span);
    }

    if let Some(hint) = hints::extract_price_hint(query) {
        // `hints::extract_price_hint` parses whole-dollar phrasing ("under
        // $25k"); `FilterSet::price_min`/`price_max` are integer minor
        // units, the same unit as `Listing::price`.
        filters.price_min = filters.price_min.or(hint.value.min.map(|dollars| dollars * 100));
        filters.price_max = filters.price_max.or(hint.value.max.map(|dollars| dollars * 100));
        spans.push(hint.span);
    }

    if let Some(hint) = hints::extract_mileage_hint(query) {
        filters.mileage_max = filters.mileage_max.or(hint.value.max);
        spans.push(hint.span);
    }

    let residual_query = remove_spans(query, spans);

    PreprocessResult {
        filters,
        residual_query,
        chassis_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chassis_code_scenario_derives_make_model_years_and_empty_residual() {
        let result = preprocess("EG6", 2026);
        assert_eq!(result.filters.make.as_deref(), Some("Honda"));
        assert_eq!(result.filters.model, vec!["Civic".to_string()]);
        assert_eq!(result.filters.year_min, Some(1992));
        assert_eq!(result.filters.year_max, Some(1995));
        assert_eq!(result.residual_query, "");
        assert!(result.chassis_code.is_some());
    }

    #[test]
    fn keyword_and_price_hint_combine_with_residual_text_preserved() {
        let result = preprocess("clean honda civic under $15k manual", 2026);
        assert_eq!(result.filters.make.as_deref(), Some("Honda"));
        assert_eq!(result.filters.model, vec!["Civic".to_string()]);
        assert_eq!(result.filters.price_max, Some(15_000_00));
        assert_eq!(result.residual_query, "clean manual");
    }

    #[test]
    fn year_and_low_mileage_hint_recognized_together() {
        let result = preprocess("1998 miata low mileage", 2026);
        assert_eq!(result.filters.year_min, Some(1998));
        assert_eq!(result.filters.mileage_max, Some(60_000));
        assert_eq!(result.residual_query, "miata");
    }

    #[test]
    fn plain_query_with_no_recognized_tokens_is_untouched() {
        let result = preprocess("reliable daily driver", 2026);
        assert_eq!(result.filters, FilterSet::default());
        assert_eq!(result.residual_query, "reliable daily driver");
    }

    #[test]
    fn derived_filters_merge_under_caller_filters() {
        let result = preprocess("EG6", 2026);
        let caller = FilterSet {
            make: Some("Toyota".to_string()),
            ..Default::default()
        };
        let merged = caller.merge_over(result.filters);
        assert_eq!(merged.make.as_deref(), Some("Toyota"));
        assert_eq!(merged.year_min, Some(1992));
    }
}
