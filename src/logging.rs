//! Logging initialization using the `tracing` ecosystem.
//!
//! The library itself only emits `tracing` events. Binaries and tests call
//! [`init_logging`] once to see them.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber: an `EnvFilter` plus a console fmt layer.
///
/// `log_level` is the default filter when `RUST_LOG` is not set
/// (e.g. `"info"` or `"switchyard=debug"`). Does nothing if a global
/// subscriber is already installed.
pub fn init_logging(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer().with_target(true).with_thread_ids(true);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed");
    }
}
