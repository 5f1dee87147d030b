//! Logging setup from cache configuration.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install a fmt subscriber honoring the configured switch, level, and
/// optional channel (a tracing target; unset means everything).
///
/// Intended for hosts without their own subscriber; calling it when one is
/// already installed is a no-op. With logging disabled nothing is installed,
/// so all cache events fall into the void.
pub fn init(config: &LoggingConfig) {
    if !config.enabled {
        return;
    }

    let directive = match &config.channel {
        Some(channel) => format!("{}={}", channel, config.level),
        None => config.level.clone(),
    };
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
