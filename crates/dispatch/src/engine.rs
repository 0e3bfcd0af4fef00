use {
    crate::{
        adapter::{SourceAdapter, SourceMeta},
        retry::{remaining, RetryPolicy},
    },
    circuit_breaker::BreakerRegistry,
    listing_core::{ErrorKind, FilterSet, Listing, SearchError},
    rate_limit::RateLimiter,
    std::{sync::Arc, time::Instant},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Ok,
    Partial,
    Failed,
}

/// One source's contribution to a dispatch round.
pub struct SourceResult {
    pub source: String,
    pub status: SourceStatus,
    pub listings: Vec<Listing>,
    pub meta: SourceMeta,
    pub error: Option<SearchError>,
}

/// Fans a `Search` call out across every enabled, non-local-index adapter
/// in parallel, applying the breaker/rate-limit/retry envelope per source.
/// Grounded on `autopilot::run_loop::RunLoop::solve`: per-source futures
/// joined with `futures::future::join_all`, each individually raced against
/// `tokio::time::timeout`.
pub struct DispatchEngine {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    breakers: Arc<BreakerRegistry>,
    rate_limiter: Arc<RateLimiter>,
    retry_policy: RetryPolicy,
}

impl DispatchEngine {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        breakers: Arc<BreakerRegistry>,
        rate_limiter: Arc<RateLimiter>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            adapters,
            breakers,
            rate_limiter,
            retry_policy,
        }
    }

    /// Looks up a single listing's current state, used by the Background
    /// Refresh Scheduler instead of a full `search`. Goes
    /// through the same breaker/rate-limit envelope as `dispatch` so
    /// refresh traffic can trip (and is blocked by) the same circuit.
    pub async fn refresh(
        &self,
        source: &str,
        source_listing_id: &str,
        deadline: Instant,
    ) -> Result<Listing, SearchError> {
        let adapter = self
            .adapters
            .iter()
            .find(|adapter| adapter.tag() == source)
            .cloned()
            .ok_or_else(|| SearchError::new(ErrorKind::Internal, format!("no adapter for source {source}")))?;

        self.breakers
            .before_call(source)
            .map_err(|_| SearchError::new(ErrorKind::CircuitOpen, "circuit breaker open"))?;

        let wait_budget = remaining(deadline);
        if self.rate_limiter.acquire(source, "refresh", wait_budget).await.is_err() {
            self.breakers.record_failure(source);
            return Err(SearchError::new(ErrorKind::RateLimited, "rate limit wait budget exhausted"));
        }

        match adapter.get_details(source_listing_id, deadline).await {
            Ok(listing) => {
                self.breakers.record_success(source);
                Ok(listing)
            }
            Err(err) => {
                if err.kind.counts_against_breaker() {
                    self.breakers.record_failure(source);
                }
                Err(err)
            }
        }
    }

    pub async fn dispatch(
        &self,
        query: &str,
        filters: &FilterSet,
        page: i64,
        per_page: i64,
        enabled_sources: &[String],
        deadline: Instant,
    ) -> Vec<SourceResult> {
        let futures = self
            .adapters
            .iter()
            .filter(|adapter| enabled_sources.iter().any(|tag| tag == adapter.tag()))
            .map(|adapter| {
                let adapter = adapter.clone();
                let breakers = self.breakers.clone();
                let rate_limiter = self.rate_limiter.clone();
                let retry_policy = self.retry_policy;
                let query = query.to_string();
                let filters = filters.clone();
                run_source(adapter, breakers, rate_limiter, retry_policy, query, filters, page, per_page, deadline)
            });

        futures::future::join_all(futures).await
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_source(
    adapter: Arc<dyn SourceAdapter>,
    breakers: Arc<BreakerRegistry>,
    rate_limiter: Arc<RateLimiter>,
    retry_policy: RetryPolicy,
    query: String,
    filters: FilterSet,
    page: i64,
    per_page: i64,
    deadline: Instant,
) -> SourceResult {
    let source = adapter.tag().to_string();
    let is_local = matches!(adapter.kind(), listing_core::SourceKind::Local);

    if !is_local {
        if breakers.before_call(&source).is_err() {
            return SourceResult {
                source,
                status: SourceStatus::Failed,
                listings: vec![],
                meta: SourceMeta::default(),
                error: Some(SearchError::new(ErrorKind::CircuitOpen, "circuit breaker open")),
            };
        }
    }

    let sub_deadline = Instant::now() + adapter.kind().default_timeout().min(remaining(deadline));

    let mut attempt = 0u32;
    let mut unauthorized_retried = false;
    loop {
        if !is_local {
            let wait_budget = remaining(sub_deadline);
            if rate_limiter
                .acquire(&source, "search", wait_budget)
                .await
                .is_err()
            {
                if !is_local {
                    breakers.record_failure(&source);
                }
                return SourceResult {
                    source,
                    status: SourceStatus::Failed,
                    listings: vec![],
                    meta: SourceMeta::default(),
                    error: Some(SearchError::new(ErrorKind::RateLimited, "rate limit wait budget exhausted")),
                };
            }
        }

        match adapter.search(&query, &filters, page, per_page, sub_deadline).await {
            Ok((listings, meta)) => {
                if !is_local {
                    breakers.record_success(&source);
                }
                let status = if meta.truncated || Instant::now() >= sub_deadline {
                    SourceStatus::Partial
                } else {
                    SourceStatus::Ok
                };
                return SourceResult {
                    source,
                    status,
                    listings,
                    meta,
                    error: None,
                };
            }
            Err(err) => {
                if !is_local && err.kind.counts_against_breaker() {
                    breakers.record_failure(&source);
                }

                if err.kind == ErrorKind::Unauthorized && !unauthorized_retried {
                    unauthorized_retried = true;
                    continue;
                }

                if err.kind.is_retryable() && retry_policy.may_retry(attempt, remaining(sub_deadline)) {
                    let delay = retry_policy.next_delay(attempt);
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                    continue;
                }

                tracing::warn!(source = %source, error = %err, "source dispatch failed");
                return SourceResult {
                    source,
                    status: SourceStatus::Failed,
                    listings: vec![],
                    meta: SourceMeta::default(),
                    error: Some(err),
                };
            }
        }
    }
}
