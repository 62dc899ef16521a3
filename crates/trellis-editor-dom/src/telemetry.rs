//! Tracing setup for hosts and tests.
//!
//! Library code only emits events under the `trellis::*` targets (`delete`,
//! `render`, `entity`, `editor`); installing a subscriber is left to the
//! embedding application. This helper installs a compact console layer whose
//! filter comes from `RUST_LOG`, falling back to `default_level`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Default console level: DEBUG in debug builds, INFO otherwise.
pub fn default_level() -> Level {
    if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Install the console subscriber.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_tracing(default_level: Level) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str().to_lowercase()));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter);

    let installed = tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(target: "trellis::editor", "tracing initialized");
    }
    installed
}
