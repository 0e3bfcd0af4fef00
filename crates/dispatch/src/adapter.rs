use {
    listing_core::{FilterSet, Listing, SearchError, SourceKind},
    std::time::Instant,
};

/// Metadata about a source's search result, beyond the listings themselves.
#[derive(Debug, Clone, Default)]
pub struct SourceMeta {
    pub total_claimed: Option<i64>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone)]
pub struct HealthProbe {
    pub status: HealthStatus,
    pub message: String,
}

/// The contract every upstream source implements. Adapters
/// normalize output to the `Listing` shape; anything adapter-specific goes
/// in `Listing::attributes`, never a core column.
///
/// Grounded on `autopilot::infra::solvers::Driver`'s `request_response`
/// shape: a thin, deadline-aware wrapper around one upstream integration.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn tag(&self) -> &str;
    fn kind(&self) -> SourceKind;

    async fn search(
        &self,
        query: &str,
        filters: &FilterSet,
        page: i64,
        per_page: i64,
        deadline: Instant,
    ) -> Result<(Vec<Listing>, SourceMeta), SearchError>;

    async fn get_details(
        &self,
        source_listing_id: &str,
        deadline: Instant,
    ) -> Result<Listing, SearchError>;

    /// Side-effect-free liveness probe.
    async fn health(&self, deadline: Instant) -> HealthProbe;
}
