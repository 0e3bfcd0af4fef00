//! Marketcheck inventory API integration: a key-authenticated
//! `ResponseMapper` with no OAuth flow, governed by a daily-quota rate
//! limit bucket.

use {
    async_trait::async_trait,
    chrono::Utc,
    dispatch::{ResponseMapper, SourceMeta},
    http_client::HttpClient,
    listing_core::{FilterSet, Listing, SearchError},
    serde::Deserialize,
    std::time::Duration,
};

#[derive(Deserialize)]
struct MarketcheckSearchResponse {
    #[serde(default)]
    listings: Vec<MarketcheckListing>,
    num_found: Option<i64>,
}

#[derive(Deserialize)]
struct MarketcheckListing {
    id: String,
    heading: String,
    #[serde(default)]
    build: Build,
    price: Option<f64>,
    miles: Option<i32>,
    vin: Option<String>,
    exterior_color: Option<String>,
    transmission: Option<String>,
    drivetrain: Option<String>,
    fuel_type: Option<String>,
    #[serde(default)]
    media: Media,
    vdp_url: Option<String>,
    dealer: Option<Dealer>,
}

#[derive(Deserialize, Default)]
struct Build {
    year: Option<i32>,
    make: Option<String>,
    model: Option<String>,
    trim: Option<String>,
    body_type: Option<String>,
}

#[derive(Deserialize, Default)]
struct Media {
    #[serde(default)]
    photo_links: Vec<String>,
}

#[derive(Deserialize)]
struct Dealer {
    name: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
}

fn listing_to_core(item: MarketcheckListing) -> Listing {
    let now = Utc::now();
    let location = item.dealer.as_ref().and_then(|dealer| {
        let parts: Vec<String> = [dealer.city.clone(), dealer.state.clone()].into_iter().flatten().collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    });

    Listing {
        id: Listing::derive_id("marketcheck", &item.id),
        source: "marketcheck".to_string(),
        source_listing_id: item.id,
        title: item.heading,
        make: item.build.make.unwrap_or_default(),
        model: item.build.model.unwrap_or_default(),
        year: item.build.year.unwrap_or(now.format("%Y").to_string().parse().unwrap_or(2026)),
        trim: item.build.trim,
        price: item.price.map(|dollars| (dollars * 100.0).round() as i64),
        mileage: item.miles,
        body_style: item.build.body_type,
        exterior_color: item.exterior_color,
        transmission: item.transmission,
        drivetrain: item.drivetrain,
        fuel_type: item.fuel_type,
        vin: item.vin,
        location,
        zip_code: item.dealer.and_then(|dealer| dealer.zip),
        dealer_name: None,
        listing_url: item.vdp_url,
        image_urls: item.media.photo_links,
        description: None,
        attributes: Default::default(),
        features: Default::default(),
        history: Default::default(),
        created_at: now,
        updated_at: now,
        last_seen_at: now,
        active: true,
        relevance_score: None,
    }
}

pub struct MarketcheckMapper {
    api_key: String,
}

impl MarketcheckMapper {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into() }
    }

    fn base_params(&self, page: i64, per_page: i64) -> Vec<(&'static str, String)> {
        vec![
            ("api_key", self.api_key.clone()),
            ("start", ((page - 1).max(0) * per_page).to_string()),
            ("rows", per_page.to_string()),
        ]
    }
}

#[async_trait]
impl ResponseMapper for MarketcheckMapper {
    async fn search(
        &self,
        client: &HttpClient,
        query: &str,
        filters: &FilterSet,
        page: i64,
        per_page: i64,
        timeout: Duration,
    ) -> Result<(Vec<Listing>, SourceMeta), SearchError> {
        let mut params = self.base_params(page, per_page);
        if !query.is_empty() {
            params.push(("search", query.to_string()));
        }
        if let Some(make) = &filters.make {
            params.push(("make", make.clone()));
        }
        if let Some(year_min) = filters.year_min {
            params.push(("year_range", format!("{year_min}-{}", filters.year_max.unwrap_or(year_min + 50))));
        }
        if let Some(price_max) = filters.price_max {
            params.push(("price_range", format!("0-{}", price_max / 100)));
        }

        let response: MarketcheckSearchResponse = client.get_json("search", &params, timeout).await?;
        let listings = response.listings.into_iter().map(listing_to_core).collect();
        Ok((
            listings,
            SourceMeta {
                total_claimed: response.num_found,
                truncated: false,
            },
        ))
    }

    async fn get_details(&self, client: &HttpClient, source_listing_id: &str, timeout: Duration) -> Result<Listing, SearchError> {
        let path = format!("listing/{source_listing_id}");
        let params = [("api_key", self.api_key.clone())];
        let item: MarketcheckListing = client.get_json(&path, &params, timeout).await?;
        Ok(listing_to_core(item))
    }
}
