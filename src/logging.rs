use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. RUST_LOG wins over `level`.
///
/// Logs go to stderr so CLI output on stdout stays clean.
pub fn init_logging(level: &str) {
    let default_filter = format!(
        "cashback_tracker={level},cashback={level},cashback_server={level},tower_http=info"
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // A second init (e.g. in tests) is not an error
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
