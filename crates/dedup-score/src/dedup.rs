use {
    listing_core::{FingerprintKey, Listing},
    std::collections::HashMap,
};

/// Deduplicates and merges listings from every dispatch source plus the
/// local index. Deterministic: the same input set always
/// produces the same winners and merged fields.
///
/// `source_priority` breaks ties between otherwise-equal candidates within
/// a group; absent sources are treated as lowest priority
/// (`SourceDescriptor::priority`).
pub fn deduplicate(listings: Vec<Listing>, source_priority: &HashMap<String, i32>) -> Vec<Listing> {
    let mut groups: HashMap<FingerprintKey, Vec<Listing>> = HashMap::new();
    for listing in listings {
        let key = FingerprintKey::for_listing(&listing);
        groups.entry(key).or_default().push(listing);
    }

    groups
        .into_values()
        .map(|group| merge_group(group, source_priority))
        .collect()
}

fn merge_group(mut group: Vec<Listing>, source_priority: &HashMap<String, i32>) -> Listing {
    let priority_of = |listing: &Listing| source_priority.get(&listing.source).copied().unwrap_or(i32::MIN);
    // Synthesized "sample" data never outranks a live record, regardless of
    // completeness (see `SeededAdapter`).
    let is_live = |l: &Listing| l.source != "sample";

    group.sort_by(|a, b| {
        let vin_rank = |l: &Listing| l.vin.is_some();
        is_live(b)
            .cmp(&is_live(a))
            .then_with(|| vin_rank(b).cmp(&vin_rank(a)))
            .then_with(|| b.completeness().cmp(&a.completeness()))
            .then_with(|| b.last_seen_at.cmp(&a.last_seen_at))
            .then_with(|| priority_of(b).cmp(&priority_of(a)))
    });

    let mut iter = group.into_iter();
    let mut winner = iter.next().expect("group is never empty");

    for other in iter {
        merge_null_fields(&mut winner, other);
    }
    winner
}

/// Merges `other`'s fields into `winner` only where `winner`'s own field is
/// null — a present field is never overwritten.
fn merge_null_fields(winner: &mut Listing, other: Listing) {
    if winner.trim.is_none() {
        winner.trim = other.trim;
    }
    if winner.price.is_none() {
        winner.price = other.price;
    }
    if winner.mileage.is_none() {
        winner.mileage = other.mileage;
    }
    if winner.body_style.is_none() {
        winner.body_style = other.body_style;
    }
    if winner.exterior_color.is_none() {
        winner.exterior_color = other.exterior_color;
    }
    if winner.transmission.is_none() {
        winner.transmission = other.transmission;
    }
    if winner.drivetrain.is_none() {
        winner.drivetrain = other.drivetrain;
    }
    if winner.fuel_type.is_none() {
        winner.fuel_type = other.fuel_type;
    }
    if winner.vin.is_none() {
        winner.vin = other.vin;
    }
    if winner.location.is_none() {
        winner.location = other.location;
    }
    if winner.zip_code.is_none() {
        winner.zip_code = other.zip_code;
    }
    if winner.dealer_name.is_none() {
        winner.dealer_name = other.dealer_name;
    }
    if winner.listing_url.is_none() {
        winner.listing_url = other.listing_url;
    }
    if winner.description.is_none() {
        winner.description = other.description;
    }
    if winner.image_urls.is_empty() {
        winner.image_urls = other.image_urls;
    }
    for (key, value) in other.attributes {
        winner.attributes.entry(key).or_insert(value);
    }
    for feature in other.features {
        winner.features.insert(feature);
    }
    for fact in other.history {
        winner.history.insert(fact);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;

    fn listing(source: &str, source_listing_id: &str, vin: Option<&str>, last_seen_offset_secs: i64) -> Listing {
        let now = Utc::now();
        Listing {
            id: Listing::derive_id(source, source_listing_id),
            source: source.to_string(),
            source_listing_id: source_listing_id.to_string(),
            title: "2020 Honda Civic".to_string(),
            make: "Honda".to_string(),
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
            vin: vin.map(str::to_string),
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
            last_seen_at: now + Duration::seconds(last_seen_offset_secs),
            active: true,
            relevance_score: None,
        }
    }

    #[test]
    fn vin_matching_listings_from_different_sources_collapse() {
        let a = listing("api_a", "1", Some("1HGCM82633A004352"), 0);
        let b = listing("scrape_b", "2", Some("1HGCM82633A004352"), 0);
        let result = deduplicate(vec![a, b], &HashMap::new());
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn no_vin_listings_from_different_sources_never_collapse() {
        let a = listing("api_a", "1", None, 0);
        let b = listing("scrape_b", "2", None, 0);
        let result = deduplicate(vec![a, b], &HashMap::new());
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn more_recent_last_seen_wins_when_otherwise_tied() {
        let older = listing("api_a", "1", Some("VIN1"), 0);
        let newer = listing("api_a", "1", Some("VIN1"), 100);
        let result = deduplicate(vec![older, newer.clone()], &HashMap::new());
        assert_eq!(result[0].last_seen_at, newer.last_seen_at);
    }

    #[test]
    fn merge_fills_null_fields_without_overwriting_present_ones() {
        let mut winner = listing("api_a", "1", Some("VIN1"), 100);
        winner.description = Some("has description".to_string());
        let mut loser = listing("api_a", "1", Some("VIN1"), 0);
        loser.description = Some("loser description".to_string());
        loser.body_style = Some("sedan".to_string());

        let result = deduplicate(vec![winner, loser], &HashMap::new());
        assert_eq!(result[0].description.as_deref(), Some("has description"));
        assert_eq!(result[0].body_style.as_deref(), Some("sedan"));
    }

    #[test]
    fn sample_source_never_wins_over_a_live_record() {
        let mut sample = listing("sample", "1", Some("VIN1"), 1000);
        sample.description = Some("seeded description".to_string());
        let live = listing("scrape_b", "2", Some("VIN1"), 0);
        let result = deduplicate(vec![sample, live], &HashMap::new());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].source, "scrape_b");
    }

    #[test]
    fn deterministic_given_the_same_input() {
        let a = listing("api_a", "1", Some("VIN1"), 0);
        let b = listing("scrape_b", "2", Some("VIN1"), 0);
        let first = deduplicate(vec![a.clone(), b.clone()], &HashMap::new());
        let second = deduplicate(vec![a, b], &HashMap::new());
        assert_eq!(first, second);
    }
}
