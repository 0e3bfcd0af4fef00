//! Process-wide observability plumbing: tracing init, a panic hook that
//! logs through `tracing`, and the metrics/liveness HTTP server.

pub mod metrics;
pub mod panic_hook;
pub mod tracing;
