//! Admin HTTP surface: per-source circuit-breaker state and rate-limit
//! bucket introspection. Served on the same
//! listener as `observe::metrics::serve_metrics`, under `/admin/*`, so
//! operators have one process-exposed port to reach for both.

use {
    axum::{extract::State, routing::get, Json, Router},
    circuit_breaker::{BreakerRegistry, CircuitState},
    dispatch::{HealthStatus, SourceAdapter},
    rate_limit::RateLimiter,
    serde::Serialize,
    std::{sync::Arc, time::Instant},
};

/// The rate-limited operations every adapter may issue, used to enumerate
/// buckets worth reporting (the registry itself only tracks buckets once
/// `acquire`d, so admin reporting asks for this fixed set per source rather
/// than trying to discover what exists).
pub(crate) const KNOWN_OPERATIONS: &[&str] = &["search", "get_details", "token_refresh"];

#[derive(Clone)]
pub struct AdminState {
    pub breakers: Arc<BreakerRegistry>,
    pub rate_limiter: Arc<RateLimiter>,
    pub adapters: Vec<Arc<dyn SourceAdapter>>,
}

#[derive(Serialize)]
struct SourceStatusView {
    source: String,
    breaker_state: &'static str,
    consecutive_failures: u32,
    health: &'static str,
    health_message: String,
}

#[derive(Serialize)]
struct RateLimitBucketView {
    source: String,
    operation: String,
    daily_quota: u32,
    tokens_remaining: u32,
}

fn circuit_state_label(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "closed",
        CircuitState::HalfOpen => "half_open",
        CircuitState::Open => "open",
    }
}

fn health_label(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Healthy => "healthy",
        HealthStatus::Degraded => "degraded",
        HealthStatus::Unhealthy => "unhealthy",
    }
}

async fn sources_handler(State(state): State<AdminState>) -> Json<Vec<SourceStatusView>> {
    let mut views = Vec::with_capacity(state.adapters.len());
    let deadline = Instant::now() + std::time::Duration::from_secs(5);
    for adapter in &state.adapters {
        let snapshot = state.breakers.snapshot(adapter.tag());
        let probe = adapter.health(deadline).await;
        views.push(SourceStatusView {
            source: adapter.tag().to_string(),
            breaker_state: circuit_state_label(snapshot.state),
            consecutive_failures: snapshot.consecutive_failures,
            health: health_label(probe.status),
            health_message: probe.message,
        });
    }
    Json(views)
}

async fn rate_limits_handler(State(state): State<AdminState>) -> Json<Vec<RateLimitBucketView>> {
    let mut views = Vec::new();
    for adapter in &state.adapters {
        for operation in KNOWN_OPERATIONS {
            let bucket = state.rate_limiter.snapshot(adapter.tag(), operation);
            views.push(RateLimitBucketView {
                source: adapter.tag().to_string(),
                operation: operation.to_string(),
                daily_quota: bucket.daily_quota,
                tokens_remaining: bucket.tokens_remaining,
            });
        }
    }
    Json(views)
}

/// Serves `/admin/sources` and `/admin/rate-limits` on `address` until the
/// listener fails. Raced via `tokio::select!` alongside `serve_metrics` and
/// the main API listener.
pub async fn serve_admin(state: AdminState, address: std::net::SocketAddr) -> std::io::Result<()> {
    let app = Router::new()
        .route("/admin/sources", get(sources_handler))
        .route("/admin/rate-limits", get(rate_limits_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(%address, "serving admin endpoints");
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_state_labels_are_stable_wire_values() {
        assert_eq!(circuit_state_label(CircuitState::Closed), "closed");
        assert_eq!(circuit_state_label(CircuitState::HalfOpen), "half_open");
        assert_eq!(circuit_state_label(CircuitState::Open), "open");
    }

    #[test]
    fn health_labels_are_stable_wire_values() {
        assert_eq!(health_label(HealthStatus::Healthy), "healthy");
        assert_eq!(health_label(HealthStatus::Degraded), "degraded");
        assert_eq!(health_label(HealthStatus::Unhealthy), "unhealthy");
    }
}
