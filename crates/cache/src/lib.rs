//! Tiered in-process result cache.
//!
//! Three independently-TTLed tiers (hot/warm/cold) with access-count based
//! promotion, glob pattern invalidation, and a single-flight barrier (via
//! `request-sharing`) so concurrent misses for the same key share one
//! upstream computation.

use {
    chrono::{DateTime, Utc},
    dashmap::DashMap,
    regex::Regex,
    request_sharing::RequestSharing,
    serde::Serialize,
    sha2::{Digest, Sha256},
    std::{future::Future, sync::Arc, time::Duration},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Cold,
    Warm,
    Hot,
}

#[derive(Debug, Clone, Copy)]
pub struct TierConfig {
    pub hot_ttl: Duration,
    pub warm_ttl: Duration,
    pub cold_ttl: Duration,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            hot_ttl: Duration::from_secs(5 * 60),
            warm_ttl: Duration::from_secs(30 * 60),
            cold_ttl: Duration::from_secs(2 * 60 * 60),
        }
    }
}

impl TierConfig {
    fn ttl(&self, tier: Tier) -> Duration {
        match tier {
            Tier::Hot => self.hot_ttl,
            Tier::Warm => self.warm_ttl,
            Tier::Cold => self.cold_ttl,
        }
    }
}

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    tier: Tier,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    access_count: u64,
}

/// Computes the cache key by
/// `hash(normalize(query) . canonical_json(filters) . sorted(source_set))`.
pub fn derive_key(normalized_query: &str, filters_json: &str, source_set: &[String]) -> String {
    let mut sources = source_set.to_vec();
    sources.sort();
    let mut hasher = Sha256::new();
    hasher.update(normalized_query.as_bytes());
    hasher.update(b"\0");
    hasher.update(filters_json.as_bytes());
    hasher.update(b"\0");
    hasher.update(sources.join(",").as_bytes());
    hex::encode(hasher.finalize())
}

/// Overrides the tier `Put` would otherwise choose by result-count heuristic.
#[derive(Debug, Clone, Copy)]
pub enum TierHint {
    Auto,
    Force(Tier),
}

/// The fixed popular-query list pre-warmed at startup and on a configurable
/// interval, transcribed from `findmycar/enhanced_cache.py`'s
/// `popular_patterns`.
pub const POPULAR_QUERY_PATTERNS: &[&str] = &[
    "honda civic",
    "toyota camry",
    "ford f150",
    "bmw 3 series",
    "mercedes c class",
    "audi a4",
    "nissan altima",
    "mazda cx5",
];

pub struct TieredCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    config: TierConfig,
    sharing: RequestSharing<String, V>,
}

impl<V> Default for TieredCache<V>
where
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new(TierConfig::default())
    }
}

impl<V> TieredCache<V>
where
    V: Clone + Send + 'static,
{
    pub fn new(config: TierConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            sharing: RequestSharing::new(),
        }
    }

    /// `Get(key)`: on hit, bumps `access_count` and may
    /// promote the entry's tier; on miss (absent or expired), returns
    /// `None`.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entry = self.entries.get_mut(key)?;
        if entry.expires_at <= Utc::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        entry.access_count += 1;
        match (entry.tier, entry.access_count) {
            (Tier::Cold, n) if n >= 3 => {
                entry.tier = Tier::Warm;
                entry.expires_at = entry.created_at + chrono_duration(self.config.ttl(Tier::Warm));
            }
            (Tier::Warm, n) if n >= 10 => {
                entry.tier = Tier::Hot;
                entry.expires_at = entry.created_at + chrono_duration(self.config.ttl(Tier::Hot));
            }
            _ => {}
        }
        Some(entry.value.clone())
    }

    /// `Put(key, value, tier_hint)`. `result_count` is
    /// used by the auto tier-selection heuristic when `hint` is
    /// `TierHint::Auto`.
    pub fn put(&self, key: String, value: V, result_count: usize, is_pre_warm_pattern: bool, hint: TierHint) {
        let tier = match hint {
            TierHint::Force(tier) => tier,
            TierHint::Auto if is_pre_warm_pattern || result_count > 10 => Tier::Hot,
            TierHint::Auto if result_count > 0 => Tier::Warm,
            TierHint::Auto => Tier::Cold,
        };
        let now = Utc::now();
        self.entries.insert(
            key,
            CacheEntry {
                value,
                tier,
                created_at: now,
                expires_at: now + chrono_duration(self.config.ttl(tier)),
                access_count: 0,
            },
        );
    }

    /// `InvalidatePattern(glob)`: drops every key
    /// matching a `*`-wildcard glob, returning the count removed. Used on
    /// ingest of new inventory to drop stale result pages.
    pub fn invalidate_pattern(&self, glob: &str) -> usize {
        let pattern = glob_to_regex(glob);
        let matching: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| pattern.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        for key in &matching {
            self.entries.remove(key);
        }
        matching.len()
    }

    /// Runs `compute` for `key` through the single-flight barrier, storing
    /// the result at `tier` on completion. Concurrent callers for the same
    /// key observe the first result.
    pub async fn get_or_compute<F>(
        &self,
        key: String,
        result_count_of: impl Fn(&V) -> usize,
        is_pre_warm_pattern: bool,
        compute: F,
    ) -> V
    where
        F: Future<Output = V> + Send + 'static,
    {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = self.sharing.shared(key.clone(), compute).await;
        let count = result_count_of(&value);
        self.put(key, value.clone(), count, is_pre_warm_pattern, TierHint::Auto);
        value
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn chrono_duration(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero())
}

fn glob_to_regex(glob: &str) -> Regex {
    let mut pattern = String::from("^");
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            c if "\\.+?()[]{}|^$".contains(c) => {
                pattern.push('\\');
                pattern.push(c);
            }
            c => pattern.push(c),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).unwrap_or_else(|_| Regex::new("$^").unwrap())
}

/// Canonicalizes a `serde_json::Value`-like filters payload into a stable
/// string for `derive_key`, by round-tripping through a sorted-key map.
pub fn canonical_json<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
    canonicalize_value(&json)
}

fn canonicalize_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let inner: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{k:?}:{}", canonicalize_value(v)))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        serde_json::Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(canonicalize_value).collect();
            format!("[{}]", inner.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_on_empty_key_is_a_miss() {
        let cache: TieredCache<i32> = TieredCache::default();
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = TieredCache::default();
        cache.put("k".into(), 42, 5, false, TierHint::Auto);
        assert_eq!(cache.get("k"), Some(42));
    }

    #[test]
    fn auto_tier_selection_follows_result_count_and_prewarm() {
        let cache = TieredCache::default();
        cache.put("prewarm".into(), 1, 0, true, TierHint::Auto);
        cache.put("big".into(), 1, 11, false, TierHint::Auto);
        cache.put("small".into(), 1, 1, false, TierHint::Auto);
        cache.put("empty".into(), 1, 0, false, TierHint::Auto);
        assert_eq!(cache.entries.get("prewarm").unwrap().tier, Tier::Hot);
        assert_eq!(cache.entries.get("big").unwrap().tier, Tier::Hot);
        assert_eq!(cache.entries.get("small").unwrap().tier, Tier::Warm);
        assert_eq!(cache.entries.get("empty").unwrap().tier, Tier::Cold);
    }

    #[test]
    fn cold_promotes_to_warm_after_three_accesses() {
        let cache = TieredCache::default();
        cache.put("k".into(), 1, 0, false, TierHint::Auto);
        for _ in 0..3 {
            cache.get("k");
        }
        assert_eq!(cache.entries.get("k").unwrap().tier, Tier::Warm);
    }

    #[test]
    fn warm_promotes_to_hot_after_ten_accesses() {
        let cache = TieredCache::default();
        cache.put("k".into(), 1, 1, false, TierHint::Auto);
        for _ in 0..10 {
            cache.get("k");
        }
        assert_eq!(cache.entries.get("k").unwrap().tier, Tier::Hot);
    }

    #[test]
    fn invalidate_pattern_drops_matching_keys_only() {
        let cache = TieredCache::default();
        cache.put("search:honda:1".into(), 1, 1, false, TierHint::Auto);
        cache.put("search:honda:2".into(), 1, 1, false, TierHint::Auto);
        cache.put("search:toyota:1".into(), 1, 1, false, TierHint::Auto);
        let removed = cache.invalidate_pattern("search:honda:*");
        assert_eq!(removed, 2);
        assert!(cache.get("search:toyota:1").is_some());
    }

    #[test]
    fn derive_key_is_order_independent_on_sources() {
        let a = derive_key("civic", "{}", &["api_a".into(), "api_b".into()]);
        let b = derive_key("civic", "{}", &["api_b".into(), "api_a".into()]);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn get_or_compute_shares_concurrent_misses() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let cache = Arc::new(TieredCache::default());
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = vec![];
        for _ in 0..4 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("k".to_string(), |_| 1, false, async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        7
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
