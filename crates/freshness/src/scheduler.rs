//! Background Refresh Scheduler.
//!
//! Four periodic tasks, each holding only a `Weak<Self>` so it exits once
//! the owning `Arc` is dropped — the same shape as
//! `autopilot::solvable_orders::update_task`. Per-listing refresh work is
//! persisted in the `refresh_tasks` table and drained by a bounded pool of
//! workers that route through the same `DispatchEngine` (and therefore the
//! same breaker/rate-limiter) as live search.

use {
    crate::{
        access::AccessTracker,
        priority::{prioritize, RefreshCandidate},
        report::{FreshnessCounts, FreshnessReport},
    },
    chrono::{DateTime, Duration, Utc},
    database::refresh_tasks::{self, RefreshTaskRow},
    dispatch::DispatchEngine,
    listing_core::SourceKind,
    local_index::LocalIndex,
    sqlx::PgPool,
    std::{
        collections::HashMap,
        sync::{Arc, Weak},
        time::{Duration as StdDuration, Instant},
    },
};

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "freshness_scheduler")]
struct Metrics {
    /// Refresh tasks that finished, by how they finished.
    #[metric(labels("outcome"))]
    tasks_completed: prometheus::IntCounterVec,
    /// `expired_pct` from the most recently generated freshness report.
    last_expired_pct: prometheus::Gauge,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub update_stale_interval: StdDuration,
    pub update_stale_batch_size: usize,
    pub refresh_popular_interval: StdDuration,
    pub refresh_popular_top_n: usize,
    pub cleanup_interval: StdDuration,
    pub retention: Duration,
    pub report_interval: StdDuration,
    pub worker_concurrency: usize,
    pub max_retries: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_stale_interval: StdDuration::from_secs(30 * 60),
            update_stale_batch_size: 50,
            refresh_popular_interval: StdDuration::from_secs(15 * 60),
            refresh_popular_top_n: 20,
            cleanup_interval: StdDuration::from_secs(24 * 60 * 60),
            retention: Duration::days(30),
            report_interval: StdDuration::from_secs(6 * 60 * 60),
            worker_concurrency: 8,
            max_retries: 3,
        }
    }
}

/// Owns the refresh_tasks table and drives the four periodic jobs.
/// Constructed once at startup and handed to
/// `BackgroundRefreshScheduler::spawn`.
pub struct BackgroundRefreshScheduler {
    pool: PgPool,
    index: Arc<LocalIndex>,
    dispatch: Arc<DispatchEngine>,
    access: Arc<AccessTracker>,
    source_kinds: HashMap<String, SourceKind>,
    config: SchedulerConfig,
    metrics: &'static Metrics,
}

impl BackgroundRefreshScheduler {
    pub fn new(
        pool: PgPool,
        index: Arc<LocalIndex>,
        dispatch: Arc<DispatchEngine>,
        access: Arc<AccessTracker>,
        source_kinds: HashMap<String, SourceKind>,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool,
            index,
            dispatch,
            access,
            source_kinds,
            config,
            metrics: Metrics::instance(global_metrics::get_metric_storage_registry())
                .expect("failed to register freshness scheduler metrics"),
        })
    }

    /// Spawns the four periodic tasks. Each one is dropped (and stops
    /// rescheduling itself) as soon as every `Arc<BackgroundRefreshScheduler>`
    /// is gone.
    pub fn spawn(self: &Arc<Self>) {
        tokio::task::spawn(update_stale_loop(Arc::downgrade(self), self.config.update_stale_interval));
        tokio::task::spawn(refresh_popular_loop(Arc::downgrade(self), self.config.refresh_popular_interval));
        tokio::task::spawn(cleanup_loop(Arc::downgrade(self), self.config.cleanup_interval));
        tokio::task::spawn(report_loop(Arc::downgrade(self), self.config.report_interval));
    }

    /// Builds a prioritized batch of stale candidates (active listings not
    /// seen in the last 24h, the `Recent`/`Stale` boundary from
    /// `classification.rs`) and enqueues `RefreshTask`s for them, then drains
    /// whatever is currently due.
    async fn update_stale_vehicles(&self) -> Result<usize, sqlx::Error> {
        let now = Utc::now();
        let candidates_pool = self
            .index
            .iterate_stale(now - Duration::hours(24), (self.config.update_stale_batch_size * 4) as i64)
            .await
            .map_err(index_to_sqlx)?;

        let mut source_of = HashMap::new();
        let candidates: Vec<RefreshCandidate> = candidates_pool
            .iter()
            .map(|listing| {
                source_of.insert(listing.id.clone(), listing.source.clone());
                RefreshCandidate {
                    listing_id: listing.id.clone(),
                    source_kind: self
                        .source_kinds
                        .get(&listing.source)
                        .copied()
                        .unwrap_or(SourceKind::Local),
                    age_days: now.signed_duration_since(listing.last_seen_at).num_seconds() as f64 / 86_400.0,
                    access_count: self.access.count(&listing.id),
                }
            })
            .collect();

        let batch = prioritize(candidates, self.config.update_stale_batch_size);
        let mut conn = self.pool.acquire().await?;
        for candidate in &batch {
            let Some(source) = source_of.get(&candidate.listing_id) else {
                continue;
            };
            let score = crate::priority::priority_score(candidate);
            refresh_tasks::enqueue(&mut conn, &candidate.listing_id, source, now, score).await?;
        }
        drop(conn);

        self.drain_due(now).await
    }

    /// `refresh_popular_vehicles`: the access-tracker's most-requested
    /// listings get enqueued regardless of their own freshness tier, so
    /// popular pages stay real-time even between `update_stale_vehicles`
    /// sweeps.
    async fn refresh_popular_vehicles(&self) -> Result<usize, sqlx::Error> {
        let now = Utc::now();
        let popular = self.access.top_n(self.config.refresh_popular_top_n);
        let mut conn = self.pool.acquire().await?;
        for (listing_id, access_count) in &popular {
            let Ok(Some(listing)) = self.index.get_by_id(listing_id).await else {
                continue;
            };
            let candidate = RefreshCandidate {
                listing_id: listing.id.clone(),
                source_kind: self
                    .source_kinds
                    .get(&listing.source)
                    .copied()
                    .unwrap_or(SourceKind::Local),
                age_days: now.signed_duration_since(listing.last_seen_at).num_seconds() as f64 / 86_400.0,
                access_count: *access_count,
            };
            let score = crate::priority::priority_score(&candidate);
            refresh_tasks::enqueue(&mut conn, &listing.id, &listing.source, now, score).await?;
        }
        drop(conn);

        self.drain_due(now).await
    }

    /// Claims whatever is currently due, up to `worker_concurrency` tasks at
    /// a time, and runs them concurrently.
    async fn drain_due(&self, now: DateTime<Utc>) -> Result<usize, sqlx::Error> {
        let tasks = {
            let mut conn = self.pool.acquire().await?;
            refresh_tasks::claim_due(&mut conn, now, self.config.worker_concurrency as i64).await?
        };
        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            handles.push(self.run_task(task));
        }
        let mut completed = 0;
        for handle in handles {
            if handle.await {
                completed += 1;
            }
        }
        Ok(completed)
    }

    /// Runs one claimed task through the dispatch engine and applies the
    /// success/not-found/transient-failure handling.
    /// Returns whether the task reached a successful refresh.
    async fn run_task(&self, task: RefreshTaskRow) -> bool {
        let Ok(Some(listing)) = self.index.get_by_id(&task.listing_id).await else {
            let _ = self.complete(task.id).await;
            return false;
        };

        let source_kind = self
            .source_kinds
            .get(&task.source)
            .copied()
            .unwrap_or(SourceKind::Local);
        let deadline = Instant::now() + source_kind.default_timeout();

        match self
            .dispatch
            .refresh(&task.source, &listing.source_listing_id, deadline)
            .await
        {
            Ok(mut refreshed) => {
                let now = Utc::now();
                refreshed.last_seen_at = now;
                refreshed.updated_at = now;
                if self.index.upsert(refreshed).await.is_ok() {
                    self.metrics.tasks_completed.with_label_values(&["refreshed"]).inc();
                    let _ = self.complete(task.id).await;
                    true
                } else {
                    let _ = self.reschedule(task.id, Utc::now() + Duration::minutes(5)).await;
                    false
                }
            }
            Err(err) if err.kind == listing_core::ErrorKind::NotFound => {
                let _ = self.index.mark_inactive(&task.source, &listing.source_listing_id).await;
                self.metrics.tasks_completed.with_label_values(&["not_found"]).inc();
                let _ = self.complete(task.id).await;
                false
            }
            Err(err) => {
                tracing::warn!(source = %task.source, listing_id = %task.listing_id, error = %err, "refresh task failed");
                let rescheduled = self
                    .reschedule(task.id, Utc::now() + Duration::minutes(5))
                    .await
                    .unwrap_or(false);
                self.metrics
                    .tasks_completed
                    .with_label_values(&[if rescheduled { "retried" } else { "dropped" }])
                    .inc();
                false
            }
        }
    }

    async fn complete(&self, id: i64) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        refresh_tasks::complete(&mut conn, id).await
    }

    async fn reschedule(&self, id: i64, next_attempt: DateTime<Utc>) -> Result<bool, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        refresh_tasks::reschedule_or_drop(&mut conn, id, next_attempt, self.config.max_retries).await
    }

    /// `cleanup_expired_data`: deactivates listings unseen past the
    /// retention window.
    async fn cleanup_expired_data(&self) -> Result<u64, local_index::IndexError> {
        let cutoff = Utc::now() - self.config.retention;
        self.index.mark_stale_inactive(cutoff).await
    }

    /// `generate_freshness_report`: snapshots the per-tier distribution and
    /// records the `expired_pct` gauge used to alert when the refresh
    /// pipeline is falling behind.
    async fn generate_freshness_report(&self) -> Result<FreshnessReport, local_index::IndexError> {
        let now = Utc::now();
        let row = self.index.freshness_counts(now).await?;
        let report = FreshnessReport::from_counts(FreshnessCounts {
            total: row.total,
            real_time: row.real_time,
            fresh: row.fresh,
            recent: row.recent,
            stale: row.stale,
            expired: row.expired,
        });
        self.metrics.last_expired_pct.set(report.expired_pct);
        for recommendation in &report.recommendations {
            tracing::info!(%recommendation, "freshness report recommendation");
        }
        Ok(report)
    }
}

fn index_to_sqlx(err: local_index::IndexError) -> sqlx::Error {
    match err {
        local_index::IndexError::Database(err) => err,
    }
}

async fn update_stale_loop(scheduler: Weak<BackgroundRefreshScheduler>, interval: StdDuration) {
    loop {
        tokio::time::sleep(interval).await;
        let Some(scheduler) = scheduler.upgrade() else {
            tracing::debug!("exiting update_stale_vehicles task");
            break;
        };
        match scheduler.update_stale_vehicles().await {
            Ok(count) => tracing::info!(count, "update_stale_vehicles completed"),
            Err(err) => tracing::error!(%err, "update_stale_vehicles failed"),
        }
    }
}

async fn refresh_popular_loop(scheduler: Weak<BackgroundRefreshScheduler>, interval: StdDuration) {
    loop {
        tokio::time::sleep(interval).await;
        let Some(scheduler) = scheduler.upgrade() else {
            tracing::debug!("exiting refresh_popular_vehicles task");
            break;
        };
        match scheduler.refresh_popular_vehicles().await {
            Ok(count) => tracing::info!(count, "refresh_popular_vehicles completed"),
            Err(err) => tracing::error!(%err, "refresh_popular_vehicles failed"),
        }
    }
}

async fn cleanup_loop(scheduler: Weak<BackgroundRefreshScheduler>, interval: StdDuration) {
    loop {
        tokio::time::sleep(interval).await;
        let Some(scheduler) = scheduler.upgrade() else {
            tracing::debug!("exiting cleanup_expired_data task");
            break;
        };
        match scheduler.cleanup_expired_data().await {
            Ok(count) => tracing::info!(count, "cleanup_expired_data completed"),
            Err(err) => tracing::error!(%err, "cleanup_expired_data failed"),
        }
    }
}

async fn report_loop(scheduler: Weak<BackgroundRefreshScheduler>, interval: StdDuration) {
    loop {
        tokio::time::sleep(interval).await;
        let Some(scheduler) = scheduler.upgrade() else {
            tracing::debug!("exiting generate_freshness_report task");
            break;
        };
        match scheduler.generate_freshness_report().await {
            Ok(report) => tracing::info!(
                total = report.total_active,
                expired_pct = report.expired_pct,
                "freshness report generated"
            ),
            Err(err) => tracing::error!(%err, "generate_freshness_report failed"),
        }
    }
}
