//! A single process-wide [`prometheus::Registry`] and the
//! [`prometheus_metric_storage::MetricStorageRegistry`] built on top of it,
//! so every crate's `#[metric]`-derived storage registers into the same
//! registry without threading one through every constructor.

use {once_cell::sync::Lazy, prometheus_metric_storage::MetricStorageRegistry};

static REGISTRY: Lazy<prometheus::Registry> = Lazy::new(prometheus::Registry::new);

static METRIC_STORAGE_REGISTRY: Lazy<MetricStorageRegistry> =
    Lazy::new(|| MetricStorageRegistry::new(REGISTRY.clone()));

/// The process-wide prometheus registry. Used directly by the `/metrics`
/// handler to gather and encode every registered metric.
pub fn get_metrics_registry() -> &'static prometheus::Registry {
    &REGISTRY
}

/// The process-wide metric storage registry every `#[metric]`-derived
/// struct registers its collectors into via `Metrics::instance(...)`.
pub fn get_metric_storage_registry() -> &'static MetricStorageRegistry {
    &METRIC_STORAGE_REGISTRY
}
