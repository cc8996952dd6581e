//! Tracing subscriber setup.
//!
//! `APP_ENV=production` (or `prod`) emits one JSON object per event for log
//! shippers. Anything else gets colored, human-readable lines.

use crate::config::get_environment;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "info";

pub fn is_production(env: &str) -> bool {
    matches!(env, "production" | "prod")
}

/// Install the global subscriber for the current `APP_ENV`. `RUST_LOG`
/// overrides the default `info` filter.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_logging() -> bool {
    init_logging_for(&get_environment())
}

pub fn init_logging_for(env: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let installed = if is_production(env) {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    installed.is_ok()
}
