use {
    crate::{
        arguments::{Arguments, EnvOverrides},
        sources::{ebay::EbayMapper, marketcheck::MarketcheckMapper, PoolGuardedAdapter},
    },
    dispatch::{HttpSourceAdapter, LocalIndexAdapter, SeededAdapter, SourceAdapter},
    http_client::HttpClient,
    listing_core::{SourceDescriptor, SourceKind},
    local_index::LocalIndex,
    rate_limit::TokenStore,
    std::{collections::HashMap, sync::Arc},
    url::Url,
};

/// The set of sources wired into this process, built once at startup from
/// `Arguments`. Credential-gated
/// sources (eBay, Marketcheck) are present only when their credentials are
/// configured; the Local Index is always present.
pub struct SourceRegistry {
    pub descriptors: Vec<SourceDescriptor>,
    pub adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn enabled_tags(&self) -> Vec<String> {
        self.descriptors.iter().filter(|d| d.enabled).map(|d| d.tag.clone()).collect()
    }

    pub fn source_kinds(&self) -> HashMap<String, SourceKind> {
        self.descriptors.iter().map(|d| (d.tag.clone(), d.kind)).collect()
    }

    /// Resolves each source's priority, applying `SOURCE_PRIORITY_<TAG>`
    /// overrides over the descriptor's built-in default.
    pub fn source_priority(&self, overrides: &EnvOverrides) -> HashMap<String, i32> {
        self.descriptors
            .iter()
            .map(|d| (d.tag.clone(), overrides.source_priority.get(&d.tag).copied().unwrap_or(d.priority)))
            .collect()
    }
}

#[allow(clippy::too_many_arguments)]
pub fn build_registry(
    args: &Arguments,
    local_index: Arc<LocalIndex>,
    token_store: Arc<TokenStore>,
    permits: Arc<tokio::sync::Semaphore>,
) -> SourceRegistry {
    let mut descriptors = Vec::new();
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    descriptors.push(SourceDescriptor::new("local_index", SourceKind::Local, 0));
    adapters.push(Arc::new(LocalIndexAdapter::new(local_index)));

    if let (Some(client_id), Some(client_secret)) = (&args.ebay_client_id, &args.ebay_client_secret) {
        token_store.register(
            "ebay",
            Arc::new(crate::sources::ebay::EbayTokenExchange::new(
                "https://api.ebay.com/identity/v1/oauth2/token",
                client_id.clone(),
                client_secret.clone(),
            )),
        );
        let client = HttpClient::new(
            Url::parse("https://api.ebay.com/").expect("static url"),
            &args.http_client,
        );
        let mapper = Arc::new(EbayMapper::new(token_store.clone()));
        let adapter: Arc<dyn SourceAdapter> = Arc::new(PoolGuardedAdapter::new(
            Arc::new(HttpSourceAdapter::new("ebay", SourceKind::Api, client, mapper)),
            permits.clone(),
        ));
        descriptors.push(SourceDescriptor::new("ebay", SourceKind::Api, 10));
        adapters.push(adapter);
    }

    if let Some(api_key) = &args.marketcheck_api_key {
        let client = HttpClient::new(
            Url::parse("https://mc-api.marketcheck.com/v2/").expect("static url"),
            &args.http_client,
        );
        let mapper = Arc::new(MarketcheckMapper::new(api_key.clone()));
        let adapter: Arc<dyn SourceAdapter> = Arc::new(PoolGuardedAdapter::new(
            Arc::new(HttpSourceAdapter::new("marketcheck", SourceKind::Api, client, mapper)),
            permits.clone(),
        ));
        descriptors.push(SourceDescriptor::new("marketcheck", SourceKind::Api, 5));
        adapters.push(adapter);
    }

    if args.enable_seeded_source || args.enable_all_sources {
        descriptors.push(SourceDescriptor::new("sample", SourceKind::Seeded, i32::MIN));
        adapters.push(Arc::new(SeededAdapter::new(args.seeded_source_count)));
    }

    SourceRegistry { descriptors, adapters }
}
