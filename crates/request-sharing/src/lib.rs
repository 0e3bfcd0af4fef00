//! Single-flight request coalescing.
//!
//! Used by the Tiered Cache so
//! that concurrent cache misses for the same key result in exactly one
//! upstream computation, with every waiter receiving a clone of the same
//! result. Built on the `futures` crate's `Shared` future combined with the
//! `Weak`-guarded shared-future idiom used elsewhere in this codebase for
//! background tasks.

use {
    futures::future::{FutureExt, Shared},
    std::{
        collections::HashMap,
        future::Future,
        hash::Hash,
        pin::Pin,
        sync::{Arc, Mutex},
    },
};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A registry of in-flight computations keyed by `K`. Every call to
/// [`RequestSharing::shared`] for a key that already has an in-flight
/// future joins it instead of starting a new one.
pub struct RequestSharing<K, V> {
    in_flight: Mutex<HashMap<K, Shared<BoxFuture<V>>>>,
}

impl<K, V> Default for RequestSharing<K, V> {
    fn default() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> RequestSharing<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `compute` for `key` unless a call for the same key is already
    /// in flight, in which case the caller joins it. The map entry is
    /// cleared once the future resolves, so the next miss starts fresh
    /// rather than caching the result here (that's the Tiered Cache's job).
    pub async fn shared<F>(&self, key: K, compute: F) -> V
    where
        F: Future<Output = V> + Send + 'static,
    {
        let shared = {
            let mut in_flight = self.in_flight.lock().unwrap();
            match in_flight.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let boxed: BoxFuture<V> = compute.boxed();
                    let shared = boxed.shared();
                    in_flight.insert(key.clone(), shared.clone());
                    shared
                }
            }
        };

        let result = shared.await;
        self.in_flight.lock().unwrap().remove(&key);
        result
    }

    /// Number of keys with an in-flight computation, for diagnostics.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn concurrent_callers_for_same_key_share_one_computation() {
        let sharing: Arc<RequestSharing<&'static str, u32>> = Arc::new(RequestSharing::new());
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = vec![];
        for _ in 0..8 {
            let sharing = sharing.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                sharing
                    .shared("honda civic", async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        42
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let sharing: RequestSharing<&'static str, u32> = RequestSharing::new();
        let a = sharing.shared("a", async { 1 });
        let b = sharing.shared("b", async { 2 });
        assert_eq!((a.await, b.await), (1, 2));
    }

    #[tokio::test]
    async fn key_is_cleared_after_completion_allowing_a_fresh_miss() {
        let sharing: RequestSharing<&'static str, u32> = RequestSharing::new();
        sharing.shared("k", async { 1 }).await;
        assert_eq!(sharing.in_flight_count(), 0);
        assert_eq!(sharing.shared("k", async { 2 }).await, 2);
    }
}
