//! Per-source circuit breaker.
//!
//! One state machine per source tag, registered in a process-wide
//! [`BreakerRegistry`]. The dispatch engine consults
//! [`BreakerRegistry::before_call`] before every upstream call and reports
//! the outcome back with [`BreakerRegistry::record_success`] /
//! [`BreakerRegistry::record_failure`].
//!
//! Grounded on the TTL-guarded ban list in
//! `solver_participation_guard::DatabaseSolverParticipationValidator`,
//! generalized from a one-way ban into the full closed/half-open/open
//! transition table.

use {
    dashmap::DashMap,
    std::{
        sync::Mutex,
        time::{Duration, Instant},
    },
};

/// Observable state of a source's breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    HalfOpen,
    Open,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub open_until: Option<Instant>,
}

struct SourceBreaker {
    state: CircuitState,
    consecutive_failures: u32,
    open_until: Option<Instant>,
    /// Set while the single half-open probe is in flight, so concurrent
    /// callers don't each send a probe.
    probe_in_flight: bool,
}

impl SourceBreaker {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            open_until: None,
            probe_in_flight: false,
        }
    }
}

/// A single source's breaker was open (or its half-open probe slot was
/// already taken); the caller must not issue the network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpen;

/// Process-wide registry of per-source breakers.
pub struct BreakerRegistry {
    sources: DashMap<String, Mutex<SourceBreaker>>,
    overrides: DashMap<String, u32>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(5 * 60))
    }
}

impl BreakerRegistry {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            sources: DashMap::new(),
            overrides: DashMap::new(),
            failure_threshold,
            cooldown,
        }
    }

    /// Builds a registry with a lower `failure_threshold` for the given
    /// source tags. Scraping adapters carry a higher permanent-error risk
    /// due to schema drift, so callers may want this lower.
    pub fn with_override(mut self, source: &str, failure_threshold: u32) -> Self {
        self.sources
            .entry(source.to_string())
            .or_insert_with(|| Mutex::new(SourceBreaker::new()));
        self.overrides.insert(source.to_string(), failure_threshold);
        self
    }

    /// Must be called before every upstream call for `source`. Transitions
    /// open -> half-open once `open_until` has passed, and admits exactly
    /// one probe through a half-open breaker.
    pub fn before_call(&self, source: &str) -> Result<(), CircuitOpen> {
        let entry = self
            .sources
            .entry(source.to_string())
            .or_insert_with(|| Mutex::new(SourceBreaker::new()));
        let mut breaker = entry.lock().unwrap();
        match breaker.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let open_until = breaker.open_until.expect("open state always has open_until");
                if Instant::now() >= open_until {
                    breaker.state = CircuitState::HalfOpen;
                    breaker.probe_in_flight = true;
                    tracing::info!(source, "circuit breaker transitioning to half-open");
                    Ok(())
                } else {
                    Err(CircuitOpen)
                }
            }
            CircuitState::HalfOpen => {
                if breaker.probe_in_flight {
                    Err(CircuitOpen)
                } else {
                    breaker.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Records a successful call. Closes a half-open breaker, or resets
    /// `consecutive_failures` to zero in the closed state.
    pub fn record_success(&self, source: &str) {
        if let Some(entry) = self.sources.get(source) {
            let mut breaker = entry.lock().unwrap();
            match breaker.state {
                CircuitState::Closed => breaker.consecutive_failures = 0,
                CircuitState::HalfOpen => {
                    tracing::info!(source, "circuit breaker closing after successful probe");
                    breaker.state = CircuitState::Closed;
                    breaker.consecutive_failures = 0;
                    breaker.open_until = None;
                    breaker.probe_in_flight = false;
                }
                CircuitState::Open => {}
            }
        }
    }

    /// Records a failed call. Opens a closed breaker once
    /// `consecutive_failures` reaches the threshold; re-opens (resetting
    /// the cooldown) a half-open breaker immediately.
    pub fn record_failure(&self, source: &str) {
        let entry = self
            .sources
            .entry(source.to_string())
            .or_insert_with(|| Mutex::new(SourceBreaker::new()));
        let mut breaker = entry.lock().unwrap();
        let threshold = self
            .overrides
            .get(source)
            .copied()
            .unwrap_or(self.failure_threshold);
        match breaker.state {
            CircuitState::Closed => {
                breaker.consecutive_failures += 1;
                if breaker.consecutive_failures >= threshold {
                    tracing::warn!(source, failures = breaker.consecutive_failures, "circuit breaker opening");
                    breaker.state = CircuitState::Open;
                    breaker.open_until = Some(Instant::now() + self.cooldown);
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!(source, "probe failed, circuit breaker re-opening");
                breaker.state = CircuitState::Open;
                breaker.open_until = Some(Instant::now() + self.cooldown);
                breaker.probe_in_flight = false;
            }
            CircuitState::Open => {}
        }
    }

    pub fn snapshot(&self, source: &str) -> BreakerSnapshot {
        match self.sources.get(source) {
            Some(entry) => {
                let breaker = entry.lock().unwrap();
                BreakerSnapshot {
                    state: breaker.state,
                    consecutive_failures: breaker.consecutive_failures,
                    open_until: breaker.open_until,
                }
            }
            None => BreakerSnapshot {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                open_until: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let registry = BreakerRegistry::new(5, Duration::from_secs(300));
        for _ in 0..4 {
            registry.before_call("scrape_b").unwrap();
            registry.record_failure("scrape_b");
        }
        assert_eq!(registry.snapshot("scrape_b").state, CircuitState::Closed);
        registry.before_call("scrape_b").unwrap();
        registry.record_failure("scrape_b");
        assert_eq!(registry.snapshot("scrape_b").state, CircuitState::Open);
    }

    #[test]
    fn open_short_circuits_without_network_call() {
        let registry = BreakerRegistry::new(1, Duration::from_secs(300));
        registry.before_call("x").unwrap();
        registry.record_failure("x");
        assert_eq!(registry.before_call("x"), Err(CircuitOpen));
    }

    #[test]
    fn success_in_closed_resets_failures() {
        let registry = BreakerRegistry::new(5, Duration::from_secs(300));
        for _ in 0..3 {
            registry.before_call("x").unwrap();
            registry.record_failure("x");
        }
        registry.before_call("x").unwrap();
        registry.record_success("x");
        assert_eq!(registry.snapshot("x").consecutive_failures, 0);
    }

    #[test]
    fn half_open_admits_exactly_one_probe() {
        let registry = BreakerRegistry::new(1, Duration::from_millis(10));
        registry.before_call("x").unwrap();
        registry.record_failure("x");
        assert_eq!(registry.snapshot("x").state, CircuitState::Open);
        std::thread::sleep(Duration::from_millis(20));
        // first caller transitions to half-open and gets the probe slot.
        assert!(registry.before_call("x").is_ok());
        assert_eq!(registry.snapshot("x").state, CircuitState::HalfOpen);
        // a second concurrent caller is rejected.
        assert_eq!(registry.before_call("x"), Err(CircuitOpen));
    }

    #[test]
    fn probe_success_closes_breaker() {
        let registry = BreakerRegistry::new(1, Duration::from_millis(10));
        registry.before_call("x").unwrap();
        registry.record_failure("x");
        std::thread::sleep(Duration::from_millis(20));
        registry.before_call("x").unwrap();
        registry.record_success("x");
        assert_eq!(registry.snapshot("x").state, CircuitState::Closed);
    }

    #[test]
    fn probe_failure_reopens_with_fresh_cooldown() {
        let registry = BreakerRegistry::new(1, Duration::from_millis(10));
        registry.before_call("x").unwrap();
        registry.record_failure("x");
        std::thread::sleep(Duration::from_millis(20));
        registry.before_call("x").unwrap();
        registry.record_failure("x");
        let snapshot = registry.snapshot("x");
        assert_eq!(snapshot.state, CircuitState::Open);
        assert!(snapshot.open_until.unwrap() > Instant::now());
    }
}
