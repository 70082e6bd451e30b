use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Meant for test harnesses and embedding binaries; library users that
/// already run a subscriber should skip this. Output is human-readable in
/// debug builds and JSON in release builds. The level defaults to `info`
/// and is overridden with `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if cfg!(debug_assertions) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .init();
    }
}
