use {
    async_trait::async_trait,
    dispatch::{HealthProbe, SourceAdapter, SourceMeta},
    listing_core::{FilterSet, Listing, SearchError, SourceKind},
    std::{sync::Arc, time::Instant},
    tokio::sync::Semaphore,
};

/// Wraps an adapter so every call holds a permit from a process-wide
/// semaphore, bounding total concurrent outbound operations across every
/// source — a global worker pool bounds the total concurrent outbound
/// operations, default 64. Kept as a decorator rather than a
/// field on `DispatchEngine` so the bound applies uniformly to both live
/// search dispatch and the Background Refresh Scheduler's `refresh` calls,
/// which share the same adapter instances.
pub struct PoolGuardedAdapter {
    inner: Arc<dyn SourceAdapter>,
    permits: Arc<Semaphore>,
}

impl PoolGuardedAdapter {
    pub fn new(inner: Arc<dyn SourceAdapter>, permits: Arc<Semaphore>) -> Self {
        Self { inner, permits }
    }
}

#[async_trait]
impl SourceAdapter for PoolGuardedAdapter {
    fn tag(&self) -> &str {
        self.inner.tag()
    }

    fn kind(&self) -> SourceKind {
        self.inner.kind()
    }

    async fn search(
        &self,
        query: &str,
        filters: &FilterSet,
        page: i64,
        per_page: i64,
        deadline: Instant,
    ) -> Result<(Vec<Listing>, SourceMeta), SearchError> {
        let _permit = self.permits.acquire().await.expect("semaphore never closed");
        self.inner.search(query, filters, page, per_page, deadline).await
    }

    async fn get_details(&self, source_listing_id: &str, deadline: Instant) -> Result<Listing, SearchError> {
        let _permit = self.permits.acquire().await.expect("semaphore never closed");
        self.inner.get_details(source_listing_id, deadline).await
    }

    async fn health(&self, deadline: Instant) -> HealthProbe {
        let Ok(_permit) = self.permits.acquire().await else {
            return HealthProbe {
                status: dispatch::HealthStatus::Unhealthy,
                message: "worker pool semaphore closed".to_string(),
            };
        };
        self.inner.health(deadline).await
    }
}
