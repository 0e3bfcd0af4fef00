use {
    crate::adapter::{HealthProbe, HealthStatus, SourceAdapter, SourceMeta},
    async_trait::async_trait,
    listing_core::{ErrorKind, FilterSet, Listing, SearchError, SourceKind},
    local_index::LocalIndex,
    std::{sync::Arc, time::Instant},
};

/// Wraps the Local Index as a dispatch-set source with kind=local, no rate
/// limit or breaker.
pub struct LocalIndexAdapter {
    index: Arc<LocalIndex>,
}

impl LocalIndexAdapter {
    pub fn new(index: Arc<LocalIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl SourceAdapter for LocalIndexAdapter {
    fn tag(&self) -> &str {
        "local_index"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn search(
        &self,
        query: &str,
        filters: &FilterSet,
        page: i64,
        per_page: i64,
        _deadline: Instant,
    ) -> Result<(Vec<Listing>, SourceMeta), SearchError> {
        let result = self
            .index
            .query(filters, Some(query), page, per_page)
            .await
            .map_err(|err| SearchError::new(ErrorKind::Internal, err.to_string()))?;
        Ok((
            result.listings,
            SourceMeta {
                total_claimed: Some(result.total),
                truncated: false,
            },
        ))
    }

    async fn get_details(&self, source_listing_id: &str, _deadline: Instant) -> Result<Listing, SearchError> {
        self.index
            .get_by_id(source_listing_id)
            .await
            .map_err(|err| SearchError::new(ErrorKind::Internal, err.to_string()))?
            .ok_or_else(|| SearchError::not_found(format!("no listing with id {source_listing_id}")))
    }

    async fn health(&self, _deadline: Instant) -> HealthProbe {
        HealthProbe {
            status: HealthStatus::Healthy,
            message: "local index has no external dependency".to_string(),
        }
    }
}
