//! Rate limiter and OAuth token cache.
//!
//! [`RateLimiter`] is a process-wide registry of buckets keyed by
//! `(source, operation)`, supporting both leaky-bucket and daily-quota
//! algorithms. [`TokenStore`] caches OAuth bearer tokens per credentialed
//! source behind a single-flight refresh lock.

mod bucket;
mod token;

pub use bucket::{Algorithm, BucketConfig, Lease, RateLimitBucket, RateLimitError, RateLimiter};
pub use token::{OAuthToken, TokenExchange, TokenRefreshError, TokenStore};
