//! Structured logging setup.
//!
//! The substrate only emits `tracing` events; installing a subscriber is left
//! to the host process. These helpers cover the common case.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::SubstrateConfig;

/// Install a global subscriber filtered at `log_level`.
///
/// `RUST_LOG` takes precedence when set. Debug builds print human-readable
/// lines, release builds print JSON. Returns false if a subscriber was
/// already installed.
pub fn init_telemetry_with_level(log_level: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,reasoning_core={level},event_model={level}",
            level = log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    #[cfg(debug_assertions)]
    let installed = registry
        .with(fmt::layer().compact().with_target(true))
        .try_init()
        .is_ok();

    #[cfg(not(debug_assertions))]
    let installed = registry
        .with(fmt::layer().json().with_current_span(true))
        .try_init()
        .is_ok();

    installed
}

/// Install a subscriber using `log_level` from the substrate config.
pub fn init_telemetry(config: &SubstrateConfig) -> bool {
    init_telemetry_with_level(&config.log_level)
}
