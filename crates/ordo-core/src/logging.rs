#![forbid(unsafe_code)]

//! Logging glue.
//!
//! Crates log with `tracing` directly under `ordo.*` targets. The
//! `tracing-json` feature adds a one-call subscriber setup that writes
//! newline-delimited JSON, filtered by `RUST_LOG` (default `info`).

/// Environment variable consulted for the log filter.
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

/// Filter used when [`LOG_FILTER_ENV`] is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install a global JSON subscriber.
///
/// Returns `false` if a global subscriber was already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json_subscriber() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
