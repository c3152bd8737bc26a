//! Tracing subscriber setup for hosts that do not install their own.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable holding a filter directive, e.g.
/// `formwright_engine=debug,formwright_rules=warn`.
pub const LOG_ENV: &str = "FORMWRIGHT_LOG";

/// Installs a global fmt subscriber filtered by [`LOG_ENV`], or by
/// `default_directive` when the variable is unset or invalid.
///
/// Returns false if a global subscriber was already installed; calling this
/// more than once is harmless.
pub fn init_logging(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).is_ok()
}
