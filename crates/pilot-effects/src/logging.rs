//! Tracing subscriber setup
//!
//! Hosts call [`init`] once at startup. `RUST_LOG` wins over the configured
//! filter; repeated calls are ignored so tests and hosts can both call it.

use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if set and valid, else `fallback`, else `info`.
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a fmt subscriber. Returns `false` if one was already installed.
pub fn init(fallback_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(fallback_filter))
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Install a subscriber that writes through the test harness capture.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("debug"))
        .with_test_writer()
        .try_init();
}
