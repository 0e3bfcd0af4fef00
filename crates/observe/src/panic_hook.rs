//! Replaces the default panic hook so a panic in any background task is
//! logged through `tracing` (and therefore reaches the same log sink as
//! everything else) instead of only going to stderr.

/// Installs a panic hook that logs the panic message and location via
/// `tracing::error!` before falling back to the default hook's output.
pub fn install() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(%info, "process panicked");
        default_hook(info);
    }));
}
