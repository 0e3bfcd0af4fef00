use {
    rand::Rng,
    std::time::{Duration, Instant},
};

/// Retry/backoff policy. `delay_i = min(base * factor^i,
/// cap) + jitter in [0, base)`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base: Duration,
    pub factor: f64,
    pub cap: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            factor: 2.0,
            cap: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    /// The delay before retry attempt `attempt` (0-indexed: the delay
    /// before the *first* retry is `next_delay(0)`).
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let exponential = self.base.as_secs_f64() * self.factor.powi(attempt as i32);
        let capped = exponential.min(self.cap.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(0.0..self.base.as_secs_f64().max(f64::EPSILON));
        Duration::from_secs_f64(capped + jitter)
    }

    /// Whether attempt `attempt` (0-indexed, already-made attempts) may be
    /// retried given `remaining_deadline`: the retry budget isn't
    /// exhausted and the scheduled delay wouldn't exceed what's left.
    pub fn may_retry(&self, attempt: u32, remaining_deadline: Duration) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        self.next_delay(attempt) <= remaining_deadline
    }
}

/// Time remaining until `deadline`, zero if already elapsed.
pub fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_grows_with_attempt_and_respects_cap() {
        let policy = RetryPolicy::default();
        let first = policy.next_delay(0);
        let second = policy.next_delay(1);
        assert!(first.as_millis() >= 100 && first.as_millis() < 200);
        assert!(second >= first);
        let late = policy.next_delay(10);
        assert!(late <= policy.cap + policy.base);
    }

    #[test]
    fn may_retry_respects_max_retries_and_deadline() {
        let policy = RetryPolicy::default();
        assert!(policy.may_retry(0, Duration::from_secs(1)));
        assert!(!policy.may_retry(3, Duration::from_secs(10)));
        assert!(!policy.may_retry(0, Duration::from_millis(1)));
    }
}
