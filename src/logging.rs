//! Optional log output for applications that have no `tracing` subscriber of their own.
//!
//! The client only emits `tracing` events; nothing is printed unless a subscriber is
//! installed, either by the application or through [`init`].

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `debug` or `mistral_client=debug`.
pub const LOG_LEVEL_ENV: &str = "MISTRAL_LOG_LEVEL";
const DEFAULT_LOG_LEVEL: &str = "error";

/// Builds the filter from [`LOG_LEVEL_ENV`], falling back to `error`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Installs a global fmt subscriber writing to stdout.
///
/// Returns `false` when a global subscriber was already set.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init()
        .is_ok()
}
