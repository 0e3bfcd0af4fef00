//! eBay Browse API integration: a `ResponseMapper` plus the OAuth client
//! credentials exchange `rate_limit::TokenStore` drives.
//!
//! Grounded on `dispatch::http_adapter::ResponseMapper` for the request
//! shape and `rate_limit::token::TokenExchange` for the credential flow.

use {
    async_trait::async_trait,
    chrono::Utc,
    dispatch::{ResponseMapper, SourceMeta},
    http_client::HttpClient,
    listing_core::{ErrorKind, FilterSet, Listing, SearchError},
    rate_limit::{OAuthToken, TokenExchange, TokenRefreshError, TokenStore},
    reqwest::Client,
    serde::Deserialize,
    std::{sync::Arc, time::Duration},
};

/// Exchanges eBay's client-credentials grant for a Browse API bearer token.
/// A plain `reqwest::Client` is used here rather than the shared
/// `HttpClient`, since the token endpoint is a different host than the
/// Browse API itself and doesn't return the `{listings}` shape `HttpClient`
/// is tuned for.
pub struct EbayTokenExchange {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl EbayTokenExchange {
    pub fn new(token_url: impl Into<String>, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[async_trait]
impl TokenExchange for EbayTokenExchange {
    async fn exchange(&self) -> Result<OAuthToken, TokenRefreshError> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", "https://api.ebay.com/oauth/api_scope"),
            ])
            .send()
            .await
            .map_err(|err| TokenRefreshError::ExchangeFailed {
                source: "ebay".to_string(),
                reason: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(TokenRefreshError::ExchangeFailed {
                source: "ebay".to_string(),
                reason: format!("token endpoint returned {}", response.status()),
            });
        }

        let body: TokenResponse = response.json().await.map_err(|err| TokenRefreshError::ExchangeFailed {
            source: "ebay".to_string(),
            reason: err.to_string(),
        })?;

        Ok(OAuthToken {
            bearer: body.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(body.expires_in),
        })
    }
}

#[derive(Deserialize)]
struct BrowseSearchResponse {
    #[serde(default)]
    item_summaries: Vec<ItemSummary>,
    total: Option<i64>,
}

#[derive(Deserialize)]
struct ItemSummary {
    item_id: String,
    title: String,
    price: Option<Price>,
    image: Option<Image>,
    item_web_url: Option<String>,
    condition: Option<String>,
    item_location: Option<ItemLocation>,
}

#[derive(Deserialize)]
struct Price {
    value: String,
}

#[derive(Deserialize)]
struct Image {
    image_url: String,
}

#[derive(Deserialize)]
struct ItemLocation {
    city: Option<String>,
    state_or_province: Option<String>,
}

#[derive(Deserialize)]
struct ItemDetail {
    item_id: String,
    title: String,
    price: Option<Price>,
    image: Option<Image>,
    item_web_url: Option<String>,
    condition: Option<String>,
    item_location: Option<ItemLocation>,
    localized_aspects: Option<Vec<Aspect>>,
}

#[derive(Deserialize)]
struct Aspect {
    name: String,
    value: String,
}

/// eBay's Browse API returns item ids in two encodings depending on
/// endpoint: `v1|<legacy_id>|0` from search, and the bare legacy id from
/// some feed exports. Both refer to the same item, so every ingestion path
/// normalizes to the bare legacy id before storing `source_listing_id` —
/// the adapter is responsible for consistent canonicalization before upsert.
fn canonicalize_item_id(raw: &str) -> String {
    raw.split('|').nth(1).unwrap_or(raw).to_string()
}

fn parse_make_model_year(title: &str) -> (String, String, i32) {
    let current_year = Utc::now().format("%Y").to_string().parse().unwrap_or(2026);
    let mut year = current_year;
    let mut rest_start = 0;
    let tokens: Vec<&str> = title.split_whitespace().collect();
    if let Some(first) = tokens.first() {
        if let Ok(parsed) = first.parse::<i32>() {
            if (1900..=current_year + 2).contains(&parsed) {
                year = parsed;
                rest_start = 1;
            }
        }
    }
    let make = tokens.get(rest_start).map(|s| s.to_string()).unwrap_or_default();
    let model = tokens.get(rest_start + 1).map(|s| s.to_string()).unwrap_or_default();
    (make, model, year)
}

fn item_to_listing(
    item_id: String,
    title: String,
    price: Option<Price>,
    image: Option<Image>,
    item_web_url: Option<String>,
    condition: Option<String>,
    item_location: Option<ItemLocation>,
    aspects: Vec<Aspect>,
) -> Listing {
    let source_listing_id = canonicalize_item_id(&item_id);
    let (make, model, year) = parse_make_model_year(&title);
    let now = Utc::now();

    let mut attributes = std::collections::BTreeMap::new();
    let mut mileage = None;
    let mut exterior_color = None;
    let mut vin = None;
    for aspect in aspects {
        match aspect.name.as_str() {
            "Mileage" => mileage = aspect.value.replace(',', "").parse::<i32>().ok(),
            "Exterior Color" => exterior_color = Some(aspect.value.clone()),
            "VIN" | "Vin" => vin = Some(aspect.value.clone()),
            other => {
                attributes.insert(other.to_string(), serde_json::Value::String(aspect.value));
            }
        }
    }

    let mut history = std::collections::BTreeSet::new();
    if let Some(condition) = &condition {
        if condition.eq_ignore_ascii_case("certified - pre-owned") {
            history.insert(listing_core::facts::CERTIFIED.to_string());
        }
    }

    Listing {
        id: Listing::derive_id("ebay", &source_listing_id),
        source: "ebay".to_string(),
        source_listing_id,
        title,
        make,
        model,
        year,
        trim: None,
        price: price.and_then(|p| p.value.parse::<f64>().ok()).map(|dollars| (dollars * 100.0).round() as i64),
        mileage,
        body_style: None,
        exterior_color,
        transmission: None,
        drivetrain: None,
        fuel_type: None,
        vin,
        location: item_location.map(|loc| {
            [loc.city, loc.state_or_province]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(", ")
        }),
        zip_code: None,
        dealer_name: None,
        listing_url: item_web_url,
        image_urls: image.map(|i| vec![i.image_url]).unwrap_or_default(),
        description: None,
        attributes,
        features: Default::default(),
        history,
        created_at: now,
        updated_at: now,
        last_seen_at: now,
        active: true,
        relevance_score: None,
    }
}

pub struct EbayMapper {
    token_store: Arc<TokenStore>,
}

impl EbayMapper {
    pub fn new(token_store: Arc<TokenStore>) -> Self {
        Self { token_store }
    }

    async fn bearer(&self, force_refresh: bool) -> Result<String, SearchError> {
        self.token_store
            .get("ebay", force_refresh)
            .await
            .map(|token| token.bearer)
            .map_err(|err| SearchError::new(ErrorKind::Unauthorized, err.to_string()))
    }
}

fn build_query(query: &str, filters: &FilterSet, page: i64, per_page: i64) -> Vec<(&'static str, String)> {
    let mut params = vec![("q".to_string(), query.to_string())];
    if let Some(make) = &filters.make {
        params[0].1 = format!("{} {}", params[0].1, make).trim().to_string();
    }
    let offset = ((page - 1).max(0) * per_page).to_string();
    let limit = per_page.to_string();
    vec![("q", params.remove(0).1), ("offset", offset), ("limit", limit)]
}

#[async_trait]
impl ResponseMapper for EbayMapper {
    async fn search(
        &self,
        client: &HttpClient,
        query: &str,
        filters: &FilterSet,
        page: i64,
        per_page: i64,
        timeout: Duration,
    ) -> Result<(Vec<Listing>, SourceMeta), SearchError> {
        let params: Vec<(&str, String)> = build_query(query, filters, page, per_page);

        let response: BrowseSearchResponse = {
            let bearer = self.bearer(false).await?;
            match client
                .get_json_bearer("buy/browse/v1/item_summary/search", &params, Some(&bearer), timeout)
                .await
            {
                Err(err) if err.kind == ErrorKind::Unauthorized => {
                    // The cached token was stale; the engine's own retry
                    // would hand back the same token, so force a refresh
                    // here before giving up.
                    let bearer = self.bearer(true).await?;
                    client
                        .get_json_bearer("buy/browse/v1/item_summary/search", &params, Some(&bearer), timeout)
                        .await?
                }
                other => other?,
            }
        };

        let listings = response
            .item_summaries
            .into_iter()
            .map(|item| {
                item_to_listing(
                    item.item_id,
                    item.title,
                    item.price,
                    item.image,
                    item.item_web_url,
                    item.condition,
                    item.item_location,
                    Vec::new(),
                )
            })
            .collect();

        Ok((
            listings,
            SourceMeta {
                total_claimed: response.total,
                truncated: false,
            },
        ))
    }

    async fn get_details(&self, client: &HttpClient, source_listing_id: &str, timeout: Duration) -> Result<Listing, SearchError> {
        let path = format!("buy/browse/v1/item/v1|{source_listing_id}|0");
        let item: ItemDetail = {
            let bearer = self.bearer(false).await?;
            match client.get_json_bearer(&path, &[], Some(&bearer), timeout).await {
                Err(err) if err.kind == ErrorKind::Unauthorized => {
                    let bearer = self.bearer(true).await?;
                    client.get_json_bearer(&path, &[], Some(&bearer), timeout).await?
                }
                other => other?,
            }
        };
        Ok(item_to_listing(
            item.item_id,
            item.title,
            item.price,
            item.image,
            item.item_web_url,
            item.condition,
            item.item_location,
            item.localized_aspects.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_the_v1_pipe_encoding_to_the_bare_legacy_id() {
        assert_eq!(canonicalize_item_id("v1|123456789|0"), "123456789");
        assert_eq!(canonicalize_item_id("123456789"), "123456789");
    }

    #[test]
    fn parses_year_make_model_from_a_conventional_title() {
        let (make, model, year) = parse_make_model_year("2019 Honda Civic EX");
        assert_eq!(make, "Honda");
        assert_eq!(model, "Civic");
        assert_eq!(year, 2019);
    }
}
