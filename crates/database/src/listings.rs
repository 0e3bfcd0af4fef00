use {
    chrono::{DateTime, Utc},
    listing_core::{FilterSet, Listing},
    serde_json::Value,
    sqlx::{types::Json, PgConnection, QueryBuilder},
};

/// One row in the `listings` table. Core columns mirror `Listing` exactly;
/// `attributes`/`features`/`history` are stored as `jsonb` so adapter-
/// specific keys never require a migration.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListingRow {
    pub id: String,
    pub source: String,
    pub source_listing_id: String,
    pub title: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub trim: Option<String>,
    pub price: Option<i64>,
    pub mileage: Option<i32>,
    pub body_style: Option<String>,
    pub exterior_color: Option<String>,
    pub transmission: Option<String>,
    pub drivetrain: Option<String>,
    pub fuel_type: Option<String>,
    pub vin: Option<String>,
    pub location: Option<String>,
    pub zip_code: Option<String>,
    pub dealer_name: Option<String>,
    pub listing_url: Option<String>,
    pub image_urls: Json<Vec<String>>,
    pub description: Option<String>,
    pub attributes: Json<std::collections::BTreeMap<String, Value>>,
    pub features: Json<std::collections::BTreeSet<String>>,
    pub history: Json<std::collections::BTreeSet<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub active: bool,
}

impl From<Listing> for ListingRow {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            source: listing.source,
            source_listing_id: listing.source_listing_id,
            title: listing.title,
            make: listing.make,
            model: listing.model,
            year: listing.year,
            trim: listing.trim,
            price: listing.price,
            mileage: listing.mileage,
            body_style: listing.body_style,
            exterior_color: listing.exterior_color,
            transmission: listing.transmission,
            drivetrain: listing.drivetrain,
            fuel_type: listing.fuel_type,
            vin: listing.vin,
            location: listing.location,
            zip_code: listing.zip_code,
            dealer_name: listing.dealer_name,
            listing_url: listing.listing_url,
            image_urls: Json(listing.image_urls),
            description: listing.description,
            attributes: Json(listing.attributes),
            features: Json(listing.features),
            history: Json(listing.history),
            created_at: listing.created_at,
            updated_at: listing.updated_at,
            last_seen_at: listing.last_seen_at,
            active: listing.active,
        }
    }
}

impl From<ListingRow> for Listing {
    fn from(row: ListingRow) -> Self {
        Listing {
            id: row.id,
            source: row.source,
            source_listing_id: row.source_listing_id,
            title: row.title,
            make: row.make,
            model: row.model,
            year: row.year,
            trim: row.trim,
            price: row.price,
            mileage: row.mileage,
            body_style: row.body_style,
            exterior_color: row.exterior_color,
            transmission: row.transmission,
            drivetrain: row.drivetrain,
            fuel_type: row.fuel_type,
            vin: row.vin,
            location: row.location,
            zip_code: row.zip_code,
            dealer_name: row.dealer_name,
            listing_url: row.listing_url,
            image_urls: row.image_urls.0,
            description: row.description,
            attributes: row.attributes.0,
            features: row.features.0,
            history: row.history.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_seen_at: row.last_seen_at,
            active: row.active,
            relevance_score: None,
        }
    }
}

/// Upserts one listing by `(source, source_listing_id)`. `id` never changes
/// across an upsert: it's the conflict target's invariant, not a column we
/// rewrite.
pub async fn upsert(ex: &mut PgConnection, listing: &ListingRow) -> Result<(), sqlx::Error> {
    const QUERY: &str = r#"
INSERT INTO listings (
    id, source, source_listing_id, title, make, model, year, trim, price, mileage,
    body_style, exterior_color, transmission, drivetrain, fuel_type, vin, location,
    zip_code, dealer_name, listing_url, image_urls, description, attributes, features,
    history, created_at, updated_at, last_seen_at, active
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
        $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29)
ON CONFLICT (source, source_listing_id) DO UPDATE SET
    title = EXCLUDED.title,
    make = EXCLUDED.make,
    model = EXCLUDED.model,
    year = EXCLUDED.year,
    trim = EXCLUDED.trim,
    price = EXCLUDED.price,
    mileage = EXCLUDED.mileage,
    body_style = EXCLUDED.body_style,
    exterior_color = EXCLUDED.exterior_color,
    transmission = EXCLUDED.transmission,
    drivetrain = EXCLUDED.drivetrain,
    fuel_type = EXCLUDED.fuel_type,
    vin = EXCLUDED.vin,
    location = EXCLUDED.location,
    zip_code = EXCLUDED.zip_code,
    dealer_name = EXCLUDED.dealer_name,
    listing_url = EXCLUDED.listing_url,
    image_urls = EXCLUDED.image_urls,
    description = EXCLUDED.description,
    attributes = EXCLUDED.attributes,
    features = EXCLUDED.features,
    history = EXCLUDED.history,
    updated_at = EXCLUDED.updated_at,
    last_seen_at = EXCLUDED.last_seen_at,
    active = EXCLUDED.active
    "#;
    sqlx::query(QUERY)
        .bind(&listing.id)
        .bind(&listing.source)
        .bind(&listing.source_listing_id)
        .bind(&listing.title)
        .bind(&listing.make)
        .bind(&listing.model)
        .bind(listing.year)
        .bind(&listing.trim)
        .bind(listing.price)
        .bind(listing.mileage)
        .bind(&listing.body_style)
        .bind(&listing.exterior_color)
        .bind(&listing.transmission)
        .bind(&listing.drivetrain)
        .bind(&listing.fuel_type)
        .bind(&listing.vin)
        .bind(&listing.location)
        .bind(&listing.zip_code)
        .bind(&listing.dealer_name)
        .bind(&listing.listing_url)
        .bind(&listing.image_urls)
        .bind(&listing.description)
        .bind(&listing.attributes)
        .bind(&listing.features)
        .bind(&listing.history)
        .bind(listing.created_at)
        .bind(listing.updated_at)
        .bind(listing.last_seen_at)
        .bind(listing.active)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn read(
    ex: &mut PgConnection,
    source: &str,
    source_listing_id: &str,
) -> Result<Option<ListingRow>, sqlx::Error> {
    const QUERY: &str = "SELECT * FROM listings WHERE source = $1 AND source_listing_id = $2";
    sqlx::query_as(QUERY)
        .bind(source)
        .bind(source_listing_id)
        .fetch_optional(ex)
        .await
}

/// Reads by the stable synthetic id rather than `(source,
/// source_listing_id)`, for callers that only have `Listing::id` (e.g. the
/// Local Index's own `GetDetails` as a dispatch-set adapter).
pub async fn read_by_id(ex: &mut PgConnection, id: &str) -> Result<Option<ListingRow>, sqlx::Error> {
    const QUERY: &str = "SELECT * FROM listings WHERE id = $1";
    sqlx::query_as(QUERY).bind(id).fetch_optional(ex).await
}

/// Marks a listing inactive. Local Index contract: records are deactivated,
/// never deleted.
pub async fn mark_inactive(
    ex: &mut PgConnection,
    source: &str,
    source_listing_id: &str,
) -> Result<(), sqlx::Error> {
    const QUERY: &str =
        "UPDATE listings SET active = false WHERE source = $1 AND source_listing_id = $2";
    sqlx::query(QUERY)
        .bind(source)
        .bind(source_listing_id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Deactivates every active listing whose `last_seen_at` is older than
/// `retention`, for `cleanup_expired_data`.
pub async fn mark_stale_inactive(
    ex: &mut PgConnection,
    older_than: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    const QUERY: &str =
        "UPDATE listings SET active = false WHERE active = true AND last_seen_at < $1";
    let result = sqlx::query(QUERY).bind(older_than).execute(ex).await?;
    Ok(result.rows_affected())
}

pub async fn count_active(ex: &mut PgConnection) -> Result<i64, sqlx::Error> {
    const QUERY: &str = "SELECT COUNT(*) FROM listings WHERE active = true";
    sqlx::query_scalar(QUERY).fetch_one(ex).await
}

/// Per-tier counts of active listings by freshness, grounded on
/// `data_freshness_manager.py::get_update_statistics`'s
/// single-query breakdown rather than one query per tier.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct FreshnessCountsRow {
    pub total: i64,
    pub real_time: i64,
    pub fresh: i64,
    pub recent: i64,
    pub stale: i64,
    pub expired: i64,
}

pub async fn freshness_counts(ex: &mut PgConnection, now: DateTime<Utc>) -> Result<FreshnessCountsRow, sqlx::Error> {
    const QUERY: &str = r#"
SELECT
    COUNT(*) AS total,
    COUNT(*) FILTER (WHERE last_seen_at > $1 - INTERVAL '5 minutes') AS real_time,
    COUNT(*) FILTER (WHERE last_seen_at > $1 - INTERVAL '1 hour'
                        AND last_seen_at <= $1 - INTERVAL '5 minutes') AS fresh,
    COUNT(*) FILTER (WHERE last_seen_at > $1 - INTERVAL '24 hours'
                        AND last_seen_at <= $1 - INTERVAL '1 hour') AS recent,
    COUNT(*) FILTER (WHERE last_seen_at > $1 - INTERVAL '7 days'
                        AND last_seen_at <= $1 - INTERVAL '24 hours') AS stale,
    COUNT(*) FILTER (WHERE last_seen_at <= $1 - INTERVAL '7 days' OR last_seen_at IS NULL) AS expired
FROM listings
WHERE active = true
    "#;
    sqlx::query_as(QUERY).bind(now).fetch_one(ex).await
}

/// Active listings whose `last_seen_at` is older than `older_than`, used by
/// the Freshness Manager to build refresh batches.
pub async fn iterate_stale(
    ex: &mut PgConnection,
    older_than: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<ListingRow>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT * FROM listings
WHERE active = true AND last_seen_at < $1
ORDER BY last_seen_at ASC
LIMIT $2
    "#;
    sqlx::query_as(QUERY)
        .bind(older_than)
        .bind(limit)
        .fetch_all(ex)
        .await
}

/// Builds and runs the conjunctive filtered query:
/// exact-match on core columns, range on year/price/mileage, exclusion set
/// on color, free-text on title/description. `free_text` is the
/// pre-processor's residual query (empty/`None` applies no text predicate).
pub async fn query_filtered(
    ex: &mut PgConnection,
    filters: &FilterSet,
    free_text: Option<&str>,
    page: i64,
    per_page: i64,
) -> Result<Vec<ListingRow>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM listings WHERE active = true");

    if let Some(text) = free_text.filter(|t| !t.trim().is_empty()) {
        let pattern = format!("%{text}%");
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(make) = &filters.make {
        builder.push(" AND make ILIKE ").push_bind(make.clone());
    }
    if !filters.model.is_empty() {
        builder.push(" AND model = ANY(").push_bind(filters.model.clone()).push(")");
    }
    if let Some(year_min) = filters.year_min {
        builder.push(" AND year >= ").push_bind(year_min);
    }
    if let Some(year_max) = filters.year_max {
        builder.push(" AND year <= ").push_bind(year_max);
    }
    if let Some(price_min) = filters.price_min {
        builder.push(" AND price >= ").push_bind(price_min);
    }
    if let Some(price_max) = filters.price_max {
        builder.push(" AND price <= ").push_bind(price_max);
    }
    if let Some(mileage_min) = filters.mileage_min {
        builder.push(" AND mileage >= ").push_bind(mileage_min);
    }
    if let Some(mileage_max) = filters.mileage_max {
        builder.push(" AND mileage <= ").push_bind(mileage_max);
    }
    if let Some(body_style) = &filters.body_style {
        builder.push(" AND body_style = ").push_bind(body_style.clone());
    }
    if !filters.exterior_color.is_empty() {
        builder
            .push(" AND exterior_color = ANY(")
            .push_bind(filters.exterior_color.clone())
            .push(")");
    }
    if !filters.exclude_colors.is_empty() {
        // Case-insensitive *contains* match, not equality: this filter
        // excludes a listing whose color contains an excluded value as a
        // substring (e.g. exclude_colors=["black"] drops "Metallic Black").
        let patterns: Vec<String> = filters.exclude_colors.iter().map(|c| format!("%{c}%")).collect();
        builder
            .push(" AND (exterior_color IS NULL OR NOT (exterior_color ILIKE ANY(")
            .push_bind(patterns)
            .push(")))");
    }
    if let Some(transmission) = &filters.transmission {
        builder.push(" AND transmission = ").push_bind(transmission.clone());
    }
    if let Some(drivetrain) = &filters.drivetrain {
        builder.push(" AND drivetrain = ").push_bind(drivetrain.clone());
    }
    if let Some(fuel_type) = &filters.fuel_type {
        builder.push(" AND fuel_type = ").push_bind(fuel_type.clone());
    }
    for feature in &filters.required_features {
        builder
            .push(" AND features @> ")
            .push_bind(Json(std::iter::once(feature.clone()).collect::<std::collections::BTreeSet<_>>()));
    }

    for (key, min_value) in &filters.attributes {
        builder
            .push(" AND (attributes->>")
            .push_bind(key.clone())
            .push(")::double precision >= ")
            .push_bind(min_value);
    }

    if filters.clean_title_only {
        builder
            .push(" AND history @> ")
            .push_bind(Json(std::iter::once(listing_core::facts::TITLE_CLEAN.to_string())
                .collect::<std::collections::BTreeSet<_>>()));
    }
    if filters.no_accidents {
        builder
            .push(" AND history @> ")
            .push_bind(Json(std::iter::once(listing_core::facts::NO_ACCIDENTS.to_string())
                .collect::<std::collections::BTreeSet<_>>()));
    }
    if filters.one_owner_only {
        builder
            .push(" AND history @> ")
            .push_bind(Json(std::iter::once(listing_core::facts::ONE_OWNER.to_string())
                .collect::<std::collections::BTreeSet<_>>()));
    }
    if filters.certified_only {
        builder
            .push(" AND features @> ")
            .push_bind(Json(std::iter::once(listing_core::facts::CERTIFIED.to_string())
                .collect::<std::collections::BTreeSet<_>>()));
    }

    builder.push(" ORDER BY last_seen_at DESC");
    builder.push(" LIMIT ").push_bind(per_page);
    builder.push(" OFFSET ").push_bind((page - 1).max(0) * per_page);

    builder.build_query_as::<ListingRow>().fetch_all(ex).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_row() -> ListingRow {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        ListingRow {
            id: Listing::derive_id("api_a", "1"),
            source: "api_a".into(),
            source_listing_id: "1".into(),
            title: "2020 Honda Civic".into(),
            make: "Honda".into(),
            model: "Civic".into(),
            year: 2020,
            trim: None,
            price: Some(22_000_00),
            mileage: Some(15_000),
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
            image_urls: Json(vec![]),
            description: None,
            attributes: Json(Default::default()),
            features: Json(Default::default()),
            history: Json(Default::default()),
            created_at: now,
            updated_at: now,
            last_seen_at: now,
            active: true,
        }
    }

    #[test]
    fn row_to_listing_round_trips_core_fields() {
        let row = sample_row();
        let listing: Listing = row.clone().into();
        assert_eq!(listing.id, row.id);
        assert_eq!(listing.source, row.source);
        assert_eq!(listing.make, row.make);
        assert_eq!(listing.relevance_score, None);
    }
}
