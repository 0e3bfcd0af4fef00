use {
    chrono::{DateTime, Duration as ChronoDuration, Utc},
    dashmap::DashMap,
    std::sync::Arc,
    thiserror::Error,
    tokio::sync::Mutex,
};

/// An OAuth bearer token cached for a credentialed source.
#[derive(Debug, Clone)]
pub struct OAuthToken {
    pub bearer: String,
    pub expires_at: DateTime<Utc>,
}

impl OAuthToken {
    /// Tokens are considered stale 60 seconds before their real expiry, so a
    /// caller never hands an about-to-expire token to an upstream call that
    /// might straddle the boundary.
    const SAFETY_MARGIN: i64 = 60;

    fn is_fresh(&self) -> bool {
        self.expires_at > Utc::now() + ChronoDuration::seconds(Self::SAFETY_MARGIN)
    }
}

#[derive(Debug, Error)]
pub enum TokenRefreshError {
    #[error("token exchange for {source} failed: {reason}")]
    ExchangeFailed { source: String, reason: String },
}

/// A single credential's refresh exchange. Implemented by each adapter that
/// needs OAuth — the exact OAuth flow is adapter-specific.
#[async_trait::async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self) -> Result<OAuthToken, TokenRefreshError>;
}

struct Slot {
    exchange: Arc<dyn TokenExchange>,
    cached: Mutex<Option<OAuthToken>>,
}

/// Process-wide cache of OAuth tokens, one slot per credentialed source.
/// Concurrent callers for the same source coalesce onto a single refresh
/// via the slot's own lock, rather than a fleet of independent exchanges.
#[derive(Default)]
pub struct TokenStore {
    slots: DashMap<String, Arc<Slot>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    pub fn register(&self, source: &str, exchange: Arc<dyn TokenExchange>) {
        self.slots.insert(
            source.to_string(),
            Arc::new(Slot {
                exchange,
                cached: Mutex::new(None),
            }),
        );
    }

    /// Returns a fresh bearer token for `source`, refreshing it if the
    /// cached one is missing, stale, or `force_refresh` is set. Callers that
    /// receive an unauthorized response from upstream after using a cached
    /// token should retry at most once with `force_refresh = true`.
    pub async fn get(&self, source: &str, force_refresh: bool) -> Result<OAuthToken, TokenRefreshError> {
        let slot = self
            .slots
            .get(source)
            .map(|entry| entry.clone())
            .ok_or_else(|| TokenRefreshError::ExchangeFailed {
                source: source.to_string(),
                reason: "no token exchange registered".to_string(),
            })?;

        let mut cached = slot.cached.lock().await;
        if !force_refresh {
            if let Some(token) = cached.as_ref() {
                if token.is_fresh() {
                    return Ok(token.clone());
                }
            }
        }

        tracing::debug!(source, force_refresh, "refreshing oauth token");
        let token = slot.exchange.exchange().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingExchange {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl TokenExchange for CountingExchange {
        async fn exchange(&self) -> Result<OAuthToken, TokenRefreshError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(OAuthToken {
                bearer: "token".to_string(),
                expires_at: Utc::now() + ChronoDuration::minutes(30),
            })
        }
    }

    #[tokio::test]
    async fn caches_fresh_token_without_re_exchange() {
        let exchange = Arc::new(CountingExchange {
            calls: AtomicU32::new(0),
        });
        let store = TokenStore::new();
        store.register("dealer_feed", exchange.clone());

        store.get("dealer_feed", false).await.unwrap();
        store.get("dealer_feed", false).await.unwrap();

        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_refresh_always_re_exchanges() {
        let exchange = Arc::new(CountingExchange {
            calls: AtomicU32::new(0),
        });
        let store = TokenStore::new();
        store.register("dealer_feed", exchange.clone());

        store.get("dealer_feed", false).await.unwrap();
        store.get("dealer_feed", true).await.unwrap();

        assert_eq!(exchange.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unregistered_source_errors() {
        let store = TokenStore::new();
        assert!(store.get("unknown", false).await.is_err());
    }
}
