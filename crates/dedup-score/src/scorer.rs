use {
    chrono::{DateTime, Utc},
    listing_core::{FilterSet, Listing, SourceKind},
    std::collections::HashMap,
};

/// Reference weights for the relevance scorer. Deployments may tune these,
/// but any deviation from the values below should be documented — these
/// are the unmodified reference values.
pub mod weights {
    pub const TITLE_TOKEN_MATCH: i64 = 10;
    pub const EXACT_MAKE_MATCH: i64 = 5;
    pub const MODEL_SUBSTRING_MATCH: i64 = 5;
    pub const PRICE_PRESENT: i64 = 2;
    pub const MILEAGE_PRESENT: i64 = 2;
    pub const HAS_IMAGE: i64 = 1;
    pub const LOCATION_PRESENT: i64 = 1;
    pub const SOURCE_KIND_API: i64 = 3;
    pub const SOURCE_KIND_FEED: i64 = 2;
    pub const FRESHNESS_WITHIN_1_DAY: i64 = 5;
    pub const FRESHNESS_WITHIN_7_DAYS: i64 = 3;
    pub const FRESHNESS_WITHIN_30_DAYS: i64 = 1;
}

/// Deterministic scoring function mapping a listing and the query/filters
/// to a non-negative integer. `source_kinds` resolves a
/// listing's `source` tag to its `SourceKind` for the source-kind weight;
/// an unregistered source contributes no source-kind weight.
pub fn score(
    listing: &Listing,
    query: &str,
    filters: &FilterSet,
    source_kinds: &HashMap<String, SourceKind>,
    now: DateTime<Utc>,
) -> i64 {
    let mut total = 0;

    let query_lower = query.to_lowercase();
    let title_lower = listing.title.to_lowercase();
    if !query_lower.is_empty() && query_lower.split_whitespace().any(|token| title_lower.contains(token)) {
        total += weights::TITLE_TOKEN_MATCH;
    }

    if let Some(make) = &filters.make {
        if make.eq_ignore_ascii_case(&listing.make) {
            total += weights::EXACT_MAKE_MATCH;
        }
    }

    if filters
        .model
        .iter()
        .any(|model| listing.model.to_lowercase().contains(&model.to_lowercase()))
    {
        total += weights::MODEL_SUBSTRING_MATCH;
    }

    if listing.price.is_some() {
        total += weights::PRICE_PRESENT;
    }
    if listing.mileage.is_some() {
        total += weights::MILEAGE_PRESENT;
    }
    if !listing.image_urls.is_empty() {
        total += weights::HAS_IMAGE;
    }
    if listing.location.is_some() {
        total += weights::LOCATION_PRESENT;
    }

    match source_kinds.get(&listing.source) {
        Some(SourceKind::Api) => total += weights::SOURCE_KIND_API,
        Some(SourceKind::Feed) => total += weights::SOURCE_KIND_FEED,
        _ => {}
    }

    let age = now.signed_duration_since(listing.last_seen_at);
    if age <= chrono::Duration::days(1) {
        total += weights::FRESHNESS_WITHIN_1_DAY;
    } else if age <= chrono::Duration::days(7) {
        total += weights::FRESHNESS_WITHIN_7_DAYS;
    } else if age <= chrono::Duration::days(30) {
        total += weights::FRESHNESS_WITHIN_30_DAYS;
    }

    total.max(0)
}

/// Scores every listing, then sorts by `(relevance_score desc, last_seen_at
/// desc, stable id asc)` and paginates. `per_page` must
/// already be clamped to `[1, 100]` by the caller
/// (`listing_core::filters::clamp_per_page`).
pub fn score_sort_and_paginate(
    mut listings: Vec<Listing>,
    query: &str,
    filters: &FilterSet,
    source_kinds: &HashMap<String, SourceKind>,
    now: DateTime<Utc>,
    page: i64,
    per_page: i64,
) -> (Vec<Listing>, i64) {
    for listing in &mut listings {
        listing.relevance_score = Some(score(listing, query, filters, source_kinds, now));
    }

    listings.sort_by(|a, b| {
        b.relevance_score
            .cmp(&a.relevance_score)
            .then_with(|| b.last_seen_at.cmp(&a.last_seen_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    let total = listings.len() as i64;
    let offset = ((page - 1).max(0) * per_page) as usize;
    let page_slice = listings.into_iter().skip(offset).take(per_page as usize).collect();
    (page_slice, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn listing(id: &str, title: &str, make: &str, last_seen_offset_days: i64) -> Listing {
        let now = Utc::now();
        Listing {
            id: id.to_string(),
            source: "api_a".to_string(),
            source_listing_id: id.to_string(),
            title: title.to_string(),
            make: make.to_string(),
            model: "Civic".to_string(),
            year: 2020,
            trim: None,
            price: Some(20_000_00),
            mileage: Some(10_000),
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
            last_seen_at: now - Duration::days(last_seen_offset_days),
            active: true,
            relevance_score: None,
        }
    }

    #[test]
    fn title_token_match_adds_weight() {
        let now = Utc::now();
        let matching = listing("1", "2020 Honda Civic", "Honda", 0);
        let not_matching = listing("2", "2020 Toyota Camry", "Toyota", 0);
        let filters = FilterSet::default();
        let kinds = HashMap::new();
        assert!(
            score(&matching, "honda civic", &filters, &kinds, now)
                > score(&not_matching, "honda civic", &filters, &kinds, now)
        );
    }

    #[test]
    fn short_query_token_matches_inside_a_longer_title() {
        // A single-word query is a token of the title, not the other way
        // around: the title's own tokens ("2020", "honda", "civic", "ex")
        // are never substrings of "civic", so only query-into-title
        // containment can award the weight here.
        let now = Utc::now();
        let matching = listing("1", "2020 Honda Civic EX", "Honda", 0);
        let filters = FilterSet::default();
        let kinds = HashMap::new();
        assert!(score(&matching, "civic", &filters, &kinds, now) >= weights::TITLE_TOKEN_MATCH);
    }

    #[test]
    fn fresher_listing_scores_higher_all_else_equal() {
        let now = Utc::now();
        let fresh = listing("1", "civic", "Honda", 0);
        let stale = listing("2", "civic", "Honda", 10);
        let filters = FilterSet::default();
        let kinds = HashMap::new();
        assert!(score(&fresh, "", &filters, &kinds, now) > score(&stale, "", &filters, &kinds, now));
    }

    #[test]
    fn api_source_kind_outscores_unregistered_source() {
        let now = Utc::now();
        let listing = listing("1", "civic", "Honda", 0);
        let filters = FilterSet::default();
        let mut kinds = HashMap::new();
        kinds.insert("api_a".to_string(), SourceKind::Api);
        assert!(score(&listing, "", &filters, &kinds, now) > score(&listing, "", &filters, &HashMap::new(), now));
    }

    #[test]
    fn pagination_respects_offset_and_per_page() {
        let now = Utc::now();
        let listings = vec![
            listing("3", "civic", "Honda", 0),
            listing("1", "civic", "Honda", 1),
            listing("2", "civic", "Honda", 2),
        ];
        let (page, total) =
            score_sort_and_paginate(listings, "", &FilterSet::default(), &HashMap::new(), now, 2, 1);
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn sort_breaks_ties_by_stable_id_ascending() {
        let now = Utc::now();
        let listings = vec![listing("b", "x", "Honda", 5), listing("a", "x", "Honda", 5)];
        let (page, _) =
            score_sort_and_paginate(listings, "", &FilterSet::default(), &HashMap::new(), now, 1, 10);
        assert_eq!(page[0].id, "a");
        assert_eq!(page[1].id, "b");
    }
}
