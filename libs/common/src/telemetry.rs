//! Tracing initialisation shared by the console binaries

use tracing_subscriber::{EnvFilter, fmt};

/// Install the global tracing subscriber
///
/// The filter is taken from `RUST_LOG` and falls back to `default_filter`.
/// Calling this twice is harmless: the second call is ignored.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
