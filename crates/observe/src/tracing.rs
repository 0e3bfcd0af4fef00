//! Initializes the global `tracing` subscriber from an `EnvFilter` string.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a process-wide `tracing` subscriber writing to stderr.
///
/// `filter` follows `tracing_subscriber::EnvFilter` syntax (for example
/// `"aggregator=debug,tower_http=info"`) and is combined with whatever the
/// `RUST_LOG` environment variable additionally specifies.
pub fn initialize(filter: &str) {
    let env_filter = EnvFilter::try_new(filter)
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("hyper=warn".parse().expect("valid directive"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .try_init()
        .ok();
}
