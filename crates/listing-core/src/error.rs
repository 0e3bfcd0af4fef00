//! Error taxonomy shared across the aggregation kernel.
//!
//! Every adapter, cache, and breaker error is classified into one of these
//! kinds so the dispatch engine and retry policy can reason about it
//! uniformly regardless of which source produced it.

use thiserror::Error;

/// Classification of an error as it crosses a component boundary.
///
/// This is a classification, not a concrete error type: an adapter maps its
/// own error (an HTTP status, a parse failure, a timeout) onto one of these
/// kinds before handing it to the dispatch engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network error, timeout, or 5xx response. Retryable.
    Transient,
    /// Upstream rejected the request due to quota exhaustion. Retryable
    /// after any `Retry-After` hint.
    RateLimited,
    /// Credential rejected or expired. Retried exactly once after a token
    /// refresh, then surfaced.
    Unauthorized,
    /// The requested record does not exist upstream. Not retryable.
    NotFound,
    /// The caller's input was invalid. Never consumes retry budget.
    Validation,
    /// Parse failure or schema drift. Counts as a breaker failure.
    Permanent,
    /// The source's circuit breaker is open; the call was short-circuited.
    CircuitOpen,
    /// The request or sub-request deadline elapsed.
    DeadlineExceeded,
    /// Any other unclassified failure, caught at a worker boundary.
    Internal,
}

impl ErrorKind {
    /// Whether the retry/backoff policy in `dispatch` may retry an error of
    /// this kind (subject to the deadline and max_retries budget).
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient | ErrorKind::RateLimited)
    }

    /// Whether a failure of this kind should count against a source's
    /// circuit breaker.
    pub fn counts_against_breaker(self) -> bool {
        matches!(
            self,
            ErrorKind::Transient | ErrorKind::Permanent | ErrorKind::Internal
        )
    }
}

/// A classified error carrying a human-readable message, as returned by an
/// adapter or any downstream component.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct SearchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SearchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }
}
