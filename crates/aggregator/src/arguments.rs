use {
    http_client::HttpClientArguments,
    std::{net::SocketAddr, time::Duration},
    url::Url,
};

fn display_option<T: std::fmt::Display>(f: &mut std::fmt::Formatter<'_>, name: &str, value: &Option<T>) -> std::fmt::Result {
    match value {
        Some(value) => writeln!(f, "{name}: {value}"),
        None => writeln!(f, "{name}: None"),
    }
}

/// Parses a plain integer number of seconds into a `Duration`, the same
/// convention the rest of the workspace's env-configured durations use.
fn duration_from_seconds(s: &str) -> Result<Duration, std::num::ParseIntError> {
    Ok(Duration::from_secs(s.parse()?))
}

/// Top-level process configuration. Every field is either a
/// `clap` long flag or its matching environment variable; credentials are
/// `Option` so their absence gates the adapter off rather than failing
/// startup.
#[derive(clap::Parser)]
pub struct Arguments {
    #[clap(flatten)]
    pub http_client: HttpClientArguments,

    /// Url of the Postgres database backing the Local Index and the
    /// refresh/saved-search tables.
    #[clap(long, env, default_value = "postgresql://")]
    pub db_url: Url,

    /// Maximum number of pooled Postgres connections.
    #[clap(long, env, default_value = "20")]
    pub db_max_connections: u32,

    /// Remote cache endpoint. Its absence falls back to the in-process
    /// tiered cache; a value is currently only recorded in logs, since no
    /// crate in this workspace's dependency stack speaks the Redis wire
    /// protocol (see DESIGN.md).
    #[clap(long, env)]
    pub redis_url: Option<Url>,

    #[clap(long, env, default_value = "0.0.0.0:9589")]
    pub metrics_address: SocketAddr,

    /// eBay Browse API client id. Leaving this (or `ebay_client_secret`)
    /// unset disables the eBay source entirely.
    #[clap(long, env)]
    pub ebay_client_id: Option<String>,
    #[clap(long, env)]
    pub ebay_client_secret: Option<String>,

    /// Marketcheck API key. Unset disables the Marketcheck source.
    #[clap(long, env)]
    pub marketcheck_api_key: Option<String>,

    /// Registers every compiled adapter regardless of credential
    /// availability, using placeholder health-only behavior for
    /// credential-gated ones. Intended for local/demo deployments.
    #[clap(long, env)]
    pub enable_all_sources: bool,

    /// Registers the synthetic `sample` source. Off by
    /// default: synthesized data must be explicitly opted into.
    #[clap(long, env)]
    pub enable_seeded_source: bool,

    /// How many listings the `sample` source synthesizes per query, when
    /// enabled.
    #[clap(long, env, default_value = "10")]
    pub seeded_source_count: usize,

    /// Overall per-request deadline. `Search` returns whatever it has once
    /// this elapses.
    #[clap(long, env, default_value = "90", value_parser = duration_from_seconds)]
    pub search_deadline: Duration,

    /// Fraction of `search_deadline` budgeted to the local index query
    /// before live dispatch is considered.
    #[clap(long, env, default_value = "0.2")]
    pub local_query_deadline_fraction: f64,

    /// Local-index result count below which live dispatch is triggered
    /// regardless of freshness.
    #[clap(long, env, default_value = "10")]
    pub live_dispatch_threshold: usize,

    /// Bound on total concurrent outbound adapter calls across the whole
    /// process.
    #[clap(long, env, default_value = "64")]
    pub global_pool_concurrency: usize,

    /// Consecutive failures before a source's circuit breaker opens.
    #[clap(long, env, default_value = "5")]
    pub breaker_failure_threshold: u32,

    /// Lower failure threshold applied to `scrape`-kind sources, which
    /// carry a higher permanent-error risk from upstream markup drift
    #[clap(long, env, default_value = "3")]
    pub scrape_breaker_failure_threshold: u32,

    /// How long an open breaker stays open before admitting a half-open
    /// probe.
    #[clap(long, env, default_value = "300", value_parser = duration_from_seconds)]
    pub breaker_cooldown: Duration,

    /// Default leaky-bucket capacity/refill for sources without a
    /// `RATE_LIMIT_<TAG>_<OP>` override.
    #[clap(long, env, default_value = "5")]
    pub default_rate_limit_capacity: u32,
    #[clap(long, env, default_value = "2")]
    pub default_rate_limit_refill_per_sec: f64,

    #[clap(long, env, default_value = "300", value_parser = duration_from_seconds)]
    pub cache_ttl_hot: Duration,
    #[clap(long, env, default_value = "1800", value_parser = duration_from_seconds)]
    pub cache_ttl_warm: Duration,
    #[clap(long, env, default_value = "7200", value_parser = duration_from_seconds)]
    pub cache_ttl_cold: Duration,

    /// How often the pre-warm background task re-populates the popular
    /// query list at warm tier. Also run once
    /// at startup.
    #[clap(long, env, default_value = "900", value_parser = duration_from_seconds)]
    pub cache_pre_warm_interval: Duration,

    /// Per-query deadline budgeted to each synthetic pre-warm `Search`.
    #[clap(long, env, default_value = "10", value_parser = duration_from_seconds)]
    pub cache_pre_warm_deadline: Duration,

    /// `RUST_LOG`/`tracing_subscriber::EnvFilter`-syntax log filter.
    #[clap(long, env, default_value = "info")]
    pub log_filter: String,
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "db_url: SECRET")?;
        writeln!(f, "db_max_connections: {}", self.db_max_connections)?;
        display_option(f, "redis_url", &self.redis_url)?;
        writeln!(f, "metrics_address: {}", self.metrics_address)?;
        writeln!(f, "ebay_client_id: {:?}", self.ebay_client_id.as_ref().map(|_| "SECRET"))?;
        writeln!(f, "ebay_client_secret: {}", if self.ebay_client_secret.is_some() { "SECRET" } else { "None" })?;
        writeln!(
            f,
            "marketcheck_api_key: {}",
            if self.marketcheck_api_key.is_some() { "SECRET" } else { "None" }
        )?;
        writeln!(f, "enable_all_sources: {}", self.enable_all_sources)?;
        writeln!(f, "enable_seeded_source: {}", self.enable_seeded_source)?;
        writeln!(f, "seeded_source_count: {}", self.seeded_source_count)?;
        writeln!(f, "search_deadline: {:?}", self.search_deadline)?;
        writeln!(f, "local_query_deadline_fraction: {}", self.local_query_deadline_fraction)?;
        writeln!(f, "live_dispatch_threshold: {}", self.live_dispatch_threshold)?;
        writeln!(f, "global_pool_concurrency: {}", self.global_pool_concurrency)?;
        writeln!(f, "breaker_failure_threshold: {}", self.breaker_failure_threshold)?;
        writeln!(f, "scrape_breaker_failure_threshold: {}", self.scrape_breaker_failure_threshold)?;
        writeln!(f, "breaker_cooldown: {:?}", self.breaker_cooldown)?;
        writeln!(f, "default_rate_limit_capacity: {}", self.default_rate_limit_capacity)?;
        writeln!(f, "default_rate_limit_refill_per_sec: {}", self.default_rate_limit_refill_per_sec)?;
        writeln!(f, "cache_ttl_hot: {:?}", self.cache_ttl_hot)?;
        writeln!(f, "cache_ttl_warm: {:?}", self.cache_ttl_warm)?;
        writeln!(f, "cache_ttl_cold: {:?}", self.cache_ttl_cold)?;
        writeln!(f, "cache_pre_warm_interval: {:?}", self.cache_pre_warm_interval)?;
        writeln!(f, "cache_pre_warm_deadline: {:?}", self.cache_pre_warm_deadline)?;
        writeln!(f, "log_filter: {}", self.log_filter)
    }
}

/// Splits `rest` (the part of a `RATE_LIMIT_<TAG>_<OP>` key after the
/// prefix, e.g. `"EBAY_GET_DETAILS"`) into `(tag, operation)` by matching
/// against the known rate-limited operations rather than a blind
/// `rsplit_once('_')`, which mis-splits both multi-word operations
/// (`get_details`, `token_refresh`) and multi-word tags (`local_index`).
/// Picks the longest matching operation suffix so `token_refresh` isn't
/// shadowed by a hypothetical shorter operation name.
fn split_tag_operation(rest: &str) -> Option<(String, String)> {
    let lower = rest.to_lowercase();
    crate::admin::KNOWN_OPERATIONS
        .iter()
        .filter(|op| lower.len() > op.len() + 1 && lower.ends_with(&format!("_{op}")))
        .max_by_key(|op| op.len())
        .map(|op| (lower[..lower.len() - op.len() - 1].to_string(), op.to_string()))
}

/// Scans the process environment for the dynamically-keyed overrides
/// (`SOURCE_PRIORITY_<TAG>`, `RATE_LIMIT_<TAG>_<OP>`) that name a source
/// tag in the key itself and so can't be declared as static `clap` fields.
pub fn env_overrides() -> EnvOverrides {
    let mut source_priority = std::collections::HashMap::new();
    let mut rate_limits = std::collections::HashMap::new();

    for (key, value) in std::env::vars() {
        if let Some(tag) = key.strip_prefix("SOURCE_PRIORITY_") {
            if let Ok(priority) = value.parse::<i32>() {
                source_priority.insert(tag.to_lowercase(), priority);
            }
        } else if let Some(rest) = key.strip_prefix("RATE_LIMIT_") {
            let Some((tag, operation)) = split_tag_operation(rest) else {
                continue;
            };
            if let Ok(capacity) = value.parse::<u32>() {
                rate_limits.insert((tag, operation), capacity);
            }
        }
    }

    EnvOverrides {
        source_priority,
        rate_limits,
    }
}

#[derive(Debug, Default)]
pub struct EnvOverrides {
    pub source_priority: std::collections::HashMap<String, i32>,
    /// Keyed by `(source_tag, operation)`, overriding the bucket's
    /// capacity (leaky-bucket capacity or daily quota, per the source's
    /// configured algorithm).
    pub rate_limits: std::collections::HashMap<(String, String), u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_parses_source_priority_and_rate_limit_keys() {
        std::env::set_var("SOURCE_PRIORITY_EBAY", "50");
        std::env::set_var("RATE_LIMIT_EBAY_SEARCH", "7");
        let overrides = env_overrides();
        assert_eq!(overrides.source_priority.get("ebay"), Some(&50));
        assert_eq!(overrides.rate_limits.get(&("ebay".to_string(), "search".to_string())), Some(&7));
        std::env::remove_var("SOURCE_PRIORITY_EBAY");
        std::env::remove_var("RATE_LIMIT_EBAY_SEARCH");
    }

    #[test]
    fn env_overrides_handles_multi_word_operations_and_tags() {
        std::env::set_var("RATE_LIMIT_EBAY_GET_DETAILS", "3");
        std::env::set_var("RATE_LIMIT_LOCAL_INDEX_TOKEN_REFRESH", "9");
        let overrides = env_overrides();
        assert_eq!(
            overrides.rate_limits.get(&("ebay".to_string(), "get_details".to_string())),
            Some(&3)
        );
        assert_eq!(
            overrides.rate_limits.get(&("local_index".to_string(), "token_refresh".to_string())),
            Some(&9)
        );
        std::env::remove_var("RATE_LIMIT_EBAY_GET_DETAILS");
        std::env::remove_var("RATE_LIMIT_LOCAL_INDEX_TOKEN_REFRESH");
    }
}
