use {
    chrono::{DateTime, Duration as ChronoDuration, Utc},
    dashmap::DashMap,
    std::{
        sync::Mutex,
        time::{Duration, Instant},
    },
    thiserror::Error,
};

/// Which bucket algorithm governs an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Steady throughput: tokens refill continuously at `refill_per_sec`,
    /// capped at `capacity`.
    LeakyBucket,
    /// A hard cap that resets on a calendar boundary.
    DailyQuota,
}

#[derive(Debug, Clone, Copy)]
pub struct BucketConfig {
    pub algorithm: Algorithm,
    /// Capacity for leaky-bucket, daily quota for daily-quota.
    pub capacity: u32,
    /// Tokens per second refilled, only meaningful for `LeakyBucket`.
    pub refill_per_sec: f64,
}

impl BucketConfig {
    pub fn leaky_bucket(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            algorithm: Algorithm::LeakyBucket,
            capacity,
            refill_per_sec,
        }
    }

    pub fn daily_quota(daily_quota: u32) -> Self {
        Self {
            algorithm: Algorithm::DailyQuota,
            capacity: daily_quota,
            refill_per_sec: 0.0,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("operation {0} is rate-limited")]
    RateLimited(String),
}

/// Observed state of a single bucket, for admin/health reporting
/// (admin endpoints expose remaining tokens per bucket).
#[derive(Debug, Clone, Copy)]
pub struct RateLimitBucket {
    pub daily_quota: u32,
    pub tokens_remaining: u32,
    pub window_reset_at: DateTime<Utc>,
}

struct BucketState {
    config: BucketConfig,
    tokens: f64,
    window_reset_at: DateTime<Utc>,
    last_refill: Instant,
}

impl BucketState {
    fn new(config: BucketConfig) -> Self {
        Self {
            tokens: config.capacity as f64,
            window_reset_at: Utc::now() + ChronoDuration::days(1),
            last_refill: Instant::now(),
            config,
        }
    }

    fn refill(&mut self) {
        match self.config.algorithm {
            Algorithm::LeakyBucket => {
                let elapsed = self.last_refill.elapsed().as_secs_f64();
                self.tokens =
                    (self.tokens + elapsed * self.config.refill_per_sec).min(self.config.capacity as f64);
                self.last_refill = Instant::now();
            }
            Algorithm::DailyQuota => {
                if Utc::now() >= self.window_reset_at {
                    self.tokens = self.config.capacity as f64;
                    self.window_reset_at = Utc::now() + ChronoDuration::days(1);
                }
            }
        }
    }

    /// Seconds until at least one token is available, if ever within this
    /// window.
    fn wait_for_one_token(&self) -> Option<Duration> {
        match self.config.algorithm {
            Algorithm::LeakyBucket => {
                if self.config.refill_per_sec <= 0.0 {
                    None
                } else {
                    let deficit = 1.0 - self.tokens;
                    Some(Duration::from_secs_f64((deficit / self.config.refill_per_sec).max(0.0)))
                }
            }
            Algorithm::DailyQuota => {
                let until_reset = self.window_reset_at - Utc::now();
                until_reset.to_std().ok()
            }
        }
    }
}

/// A successful acquisition; `observed_wait` is how long the caller actually
/// waited before the lease was granted.
#[derive(Debug, Clone, Copy)]
pub struct Lease {
    pub observed_wait: Duration,
}

/// Process-wide registry of rate-limit buckets keyed by `(source,
/// operation)`.
pub struct RateLimiter {
    buckets: DashMap<(String, String), Mutex<BucketState>>,
    configs: DashMap<(String, String), BucketConfig>,
    default_config: BucketConfig,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(BucketConfig::leaky_bucket(10, 1.0))
    }
}

impl RateLimiter {
    pub fn new(default_config: BucketConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            configs: DashMap::new(),
            default_config,
        }
    }

    /// Installs a non-default config for `(source, operation)`, e.g. from
    /// `RATE_LIMIT_<TAG>_<OP>` env overrides.
    pub fn configure(&self, source: &str, operation: &str, config: BucketConfig) {
        self.configs
            .insert((source.to_string(), operation.to_string()), config);
    }

    fn entry(&self, source: &str, operation: &str) -> dashmap::mapref::one::RefMut<'_, (String, String), Mutex<BucketState>> {
        let key = (source.to_string(), operation.to_string());
        if !self.buckets.contains_key(&key) {
            let config = self
                .configs
                .get(&key)
                .map(|c| *c)
                .unwrap_or(self.default_config);
            self.buckets
                .entry(key.clone())
                .or_insert_with(|| Mutex::new(BucketState::new(config)));
        }
        self.buckets.get_mut(&key).unwrap()
    }

    /// Acquires one token for `(source, operation)`, waiting up to
    /// `max_wait` for one to become available. Returns the observed wait, or
    /// a rate-limited error if no token would be available within
    /// `max_wait`.
    pub async fn acquire(
        &self,
        source: &str,
        operation: &str,
        max_wait: Duration,
    ) -> Result<Lease, RateLimitError> {
        let start = Instant::now();
        loop {
            let wait = {
                let entry = self.entry(source, operation);
                let mut state = entry.lock().unwrap();
                state.refill();
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return Ok(Lease {
                        observed_wait: start.elapsed(),
                    });
                }
                state.wait_for_one_token()
            };
            match wait {
                Some(wait) if start.elapsed() + wait <= max_wait => {
                    tokio::time::sleep(wait.min(Duration::from_millis(50))).await;
                }
                _ => {
                    return Err(RateLimitError::RateLimited(format!(
                        "{source}:{operation}"
                    )))
                }
            }
        }
    }

    /// Current bucket snapshot for admin/health reporting.
    pub fn snapshot(&self, source: &str, operation: &str) -> RateLimitBucket {
        let entry = self.entry(source, operation);
        let mut state = entry.lock().unwrap();
        state.refill();
        RateLimitBucket {
            daily_quota: state.config.capacity,
            tokens_remaining: state.tokens.floor().max(0.0) as u32,
            window_reset_at: state.window_reset_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquires_immediately_while_tokens_remain() {
        let limiter = RateLimiter::new(BucketConfig::leaky_bucket(2, 0.0));
        limiter
            .acquire("api_a", "search", Duration::from_millis(10))
            .await
            .unwrap();
        limiter
            .acquire("api_a", "search", Duration::from_millis(10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejects_when_exhausted_and_no_refill() {
        let limiter = RateLimiter::new(BucketConfig::leaky_bucket(1, 0.0));
        limiter
            .acquire("api_a", "search", Duration::from_millis(10))
            .await
            .unwrap();
        let err = limiter
            .acquire("api_a", "search", Duration::from_millis(10))
            .await
            .unwrap_err();
        assert_eq!(err, RateLimitError::RateLimited("api_a:search".into()));
    }

    #[tokio::test]
    async fn tokens_remaining_never_negative() {
        let limiter = RateLimiter::new(BucketConfig::leaky_bucket(1, 0.0));
        let _ = limiter
            .acquire("api_a", "search", Duration::from_millis(1))
            .await;
        let _ = limiter
            .acquire("api_a", "search", Duration::from_millis(1))
            .await;
        assert!(limiter.snapshot("api_a", "search").tokens_remaining == 0);
    }

    #[tokio::test]
    async fn daily_quota_tracks_remaining() {
        let limiter = RateLimiter::new(BucketConfig::daily_quota(5));
        for _ in 0..5 {
            limiter
                .acquire("marketcheck", "search", Duration::from_millis(10))
                .await
                .unwrap();
        }
        assert_eq!(
            limiter.snapshot("marketcheck", "search").tokens_remaining,
            0
        );
        assert!(limiter
            .acquire("marketcheck", "search", Duration::from_millis(10))
            .await
            .is_err());
    }
}
