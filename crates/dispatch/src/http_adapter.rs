use {
    crate::adapter::{HealthProbe, HealthStatus, SourceAdapter, SourceMeta},
    async_trait::async_trait,
    http_client::HttpClient,
    listing_core::{ErrorKind, FilterSet, Listing, SearchError, SourceKind},
    std::{sync::Arc, time::Instant},
};

/// Upstream-specific request construction and response parsing, injected
/// into an [`HttpSourceAdapter`]. Each concrete vendor integration (REST
/// API, HTML scrape target, RSS/Atom feed) implements this; the adapter
/// itself only owns the transport and the kind/timeout/tag identity.
#[async_trait]
pub trait ResponseMapper: Send + Sync {
    async fn search(
        &self,
        client: &HttpClient,
        query: &str,
        filters: &FilterSet,
        page: i64,
        per_page: i64,
        timeout: std::time::Duration,
    ) -> Result<(Vec<Listing>, SourceMeta), SearchError>;

    async fn get_details(
        &self,
        client: &HttpClient,
        source_listing_id: &str,
        timeout: std::time::Duration,
    ) -> Result<Listing, SearchError>;
}

/// A source adapter backed by an HTTP upstream. `kind` governs the default
/// sub-deadline the Dispatch Engine applies (api=30s,
/// scrape=60s, feed=15s); `mapper` does the per-vendor request/response
/// work so this struct stays generic across the three HTTP-backed kinds.
pub struct HttpSourceAdapter {
    tag: String,
    kind: SourceKind,
    client: HttpClient,
    mapper: Arc<dyn ResponseMapper>,
}

impl HttpSourceAdapter {
    pub fn new(tag: impl Into<String>, kind: SourceKind, client: HttpClient, mapper: Arc<dyn ResponseMapper>) -> Self {
        assert!(
            matches!(kind, SourceKind::Api | SourceKind::Scrape | SourceKind::Feed),
            "HttpSourceAdapter only supports HTTP-backed source kinds"
        );
        Self {
            tag: tag.into(),
            kind,
            client,
            mapper,
        }
    }

    fn time_budget(&self, deadline: Instant) -> std::time::Duration {
        let remaining = deadline.saturating_duration_since(Instant::now());
        remaining.min(self.kind.default_timeout())
    }
}

#[async_trait]
impl SourceAdapter for HttpSourceAdapter {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn search(
        &self,
        query: &str,
        filters: &FilterSet,
        page: i64,
        per_page: i64,
        deadline: Instant,
    ) -> Result<(Vec<Listing>, SourceMeta), SearchError> {
        let timeout = self.time_budget(deadline);
        if timeout.is_zero() {
            return Err(SearchError::new(ErrorKind::DeadlineExceeded, "no time budget remaining"));
        }
        self.mapper.search(&self.client, query, filters, page, per_page, timeout).await
    }

    async fn get_details(&self, source_listing_id: &str, deadline: Instant) -> Result<Listing, SearchError> {
        let timeout = self.time_budget(deadline);
        if timeout.is_zero() {
            return Err(SearchError::new(ErrorKind::DeadlineExceeded, "no time budget remaining"));
        }
        self.mapper.get_details(&self.client, source_listing_id, timeout).await
    }

    async fn health(&self, deadline: Instant) -> HealthProbe {
        let timeout = self.time_budget(deadline);
        match self
            .client
            .get_json::<serde_json::Value>("health", &[], timeout)
            .await
        {
            Ok(_) => HealthProbe {
                status: HealthStatus::Healthy,
                message: "ok".to_string(),
            },
            Err(err) => HealthProbe {
                status: HealthStatus::Degraded,
                message: err.to_string(),
            },
        }
    }
}
