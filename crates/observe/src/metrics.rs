//! The `/metrics` and `/health/readiness` HTTP endpoints served alongside
//! the aggregator's main API.

use {
    async_trait::async_trait,
    axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router},
    prometheus::{Encoder, TextEncoder},
    std::{net::SocketAddr, sync::Arc},
};

/// Implemented by whatever the binary considers "alive" — typically a
/// handle that checks the last successful search/refresh cycle timestamp.
#[async_trait]
pub trait LivenessChecking: Send + Sync {
    async fn is_alive(&self) -> bool;
}

/// Re-exports the process-wide registry for convenience so callers don't
/// need to depend on `global-metrics` directly just to gather metrics.
pub fn get_registry() -> &'static prometheus::Registry {
    global_metrics::get_metrics_registry()
}

pub fn get_storage_registry() -> &'static prometheus_metric_storage::MetricStorageRegistry {
    global_metrics::get_metric_storage_registry()
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = get_registry().gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(%err, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new());
    }
    (StatusCode::OK, String::from_utf8_lossy(&buffer).into_owned())
}

async fn readiness_handler(State(liveness): State<Arc<dyn LivenessChecking>>) -> impl IntoResponse {
    if liveness.is_alive().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Serves `/metrics` and `/health/readiness` on `address` until the
/// listener fails. Intended to be raced via `tokio::select!` against the
/// process's other long-running tasks.
pub async fn serve_metrics(liveness: Arc<dyn LivenessChecking>, address: SocketAddr) -> std::io::Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health/readiness", get(readiness_handler))
        .with_state(liveness);

    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(%address, "serving metrics");
    axum::serve(listener, app).await
}
