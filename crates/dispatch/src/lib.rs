//! Source adapters and the fan-out dispatch engine.

mod adapter;
mod engine;
mod http_adapter;
mod local_index_adapter;
mod retry;
mod seeded;

pub use adapter::{HealthProbe, HealthStatus, SourceAdapter, SourceMeta};
pub use engine::{DispatchEngine, SourceResult, SourceStatus};
pub use http_adapter::{HttpSourceAdapter, ResponseMapper};
pub use local_index_adapter::LocalIndexAdapter;
pub use retry::RetryPolicy;
pub use seeded::SeededAdapter;

#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        circuit_breaker::BreakerRegistry,
        listing_core::{ErrorKind, FilterSet, Listing, SearchError, SourceKind},
        rate_limit::{BucketConfig, RateLimiter},
        std::{
            sync::{
                atomic::{AtomicU32, Ordering},
                Arc,
            },
            time::{Duration, Instant},
        },
    };

    struct FlakyAdapter {
        tag: String,
        calls: AtomicU32,
        fail_first_n: u32,
    }

    #[async_trait]
    impl SourceAdapter for FlakyAdapter {
        fn tag(&self) -> &str {
            &self.tag
        }

        fn kind(&self) -> SourceKind {
            SourceKind::Api
        }

        async fn search(
            &self,
            _query: &str,
            _filters: &FilterSet,
            _page: i64,
            _per_page: i64,
            _deadline: Instant,
        ) -> Result<(Vec<Listing>, SourceMeta), SearchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first_n {
                return Err(SearchError::transient("simulated transient failure"));
            }
            Ok((vec![], SourceMeta::default()))
        }

        async fn get_details(&self, _id: &str, _deadline: Instant) -> Result<Listing, SearchError> {
            unimplemented!()
        }

        async fn health(&self, _deadline: Instant) -> HealthProbe {
            HealthProbe {
                status: HealthStatus::Healthy,
                message: "ok".to_string(),
            }
        }
    }

    fn engine_with(adapters: Vec<Arc<dyn SourceAdapter>>) -> DispatchEngine {
        DispatchEngine::new(
            adapters,
            Arc::new(BreakerRegistry::new(5, Duration::from_secs(300))),
            Arc::new(RateLimiter::new(BucketConfig::leaky_bucket(100, 1000.0))),
            RetryPolicy {
                base: Duration::from_millis(1),
                factor: 2.0,
                cap: Duration::from_millis(10),
                max_retries: 3,
            },
        )
    }

    #[tokio::test]
    async fn transient_failure_is_retried_and_eventually_succeeds() {
        let adapter: Arc<dyn SourceAdapter> = Arc::new(FlakyAdapter {
            tag: "api_a".to_string(),
            calls: AtomicU32::new(0),
            fail_first_n: 2,
        });
        let engine = engine_with(vec![adapter]);
        let results = engine
            .dispatch(
                "civic",
                &FilterSet::default(),
                1,
                20,
                &["api_a".to_string()],
                Instant::now() + Duration::from_secs(5),
            )
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, SourceStatus::Ok);
    }

    #[tokio::test]
    async fn open_breaker_short_circuits_without_calling_adapter() {
        let adapter: Arc<dyn SourceAdapter> = Arc::new(FlakyAdapter {
            tag: "api_b".to_string(),
            calls: AtomicU32::new(0),
            fail_first_n: u32::MAX,
        });
        let breakers = Arc::new(BreakerRegistry::new(1, Duration::from_secs(300)));
        breakers.before_call("api_b").unwrap();
        breakers.record_failure("api_b");

        let engine = DispatchEngine::new(
            vec![adapter],
            breakers,
            Arc::new(RateLimiter::new(BucketConfig::leaky_bucket(100, 1000.0))),
            RetryPolicy::default(),
        );
        let results = engine
            .dispatch(
                "civic",
                &FilterSet::default(),
                1,
                20,
                &["api_b".to_string()],
                Instant::now() + Duration::from_secs(5),
            )
            .await;
        assert_eq!(results[0].status, SourceStatus::Failed);
        assert_eq!(results[0].error.as_ref().unwrap().kind, ErrorKind::CircuitOpen);
    }

    #[tokio::test]
    async fn disabled_sources_are_skipped() {
        let adapter: Arc<dyn SourceAdapter> = Arc::new(FlakyAdapter {
            tag: "api_c".to_string(),
            calls: AtomicU32::new(0),
            fail_first_n: 0,
        });
        let engine = engine_with(vec![adapter]);
        let results = engine
            .dispatch(
                "civic",
                &FilterSet::default(),
                1,
                20,
                &[],
                Instant::now() + Duration::from_secs(5),
            )
            .await;
        assert!(results.is_empty());
    }
}
