use tracing::warn;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const FALLBACK_DIRECTIVE: &str = "info";

/// Parse a filter directive, falling back to `info` when it is malformed.
pub(crate) fn build_filter(directive: &str) -> (EnvFilter, bool) {
    match EnvFilter::try_new(directive) {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(FALLBACK_DIRECTIVE), false),
    }
}

/// Install the global fmt subscriber. Repeated calls are ignored.
pub fn init(directive: &str) {
    let (filter, valid) = build_filter(directive);
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_ok() && !valid {
        warn!(
            "Ignoring invalid log filter '{}', using '{}'",
            directive, FALLBACK_DIRECTIVE
        );
    }
}
