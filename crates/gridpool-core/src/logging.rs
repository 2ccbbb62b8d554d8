//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events; installing a subscriber is up to the embedding
//! service. `init` is the standard way to do it from a [`LoggingConfig`].

use crate::config::LoggingConfig;
use crate::{GridpoolError, Result};
use tracing_subscriber::EnvFilter;

/// Overrides `LoggingConfig::level` with a full filter directive when set.
pub const LOG_FILTER_ENV: &str = "GRIDPOOL_LOG";

/// Filter for `config`: `GRIDPOOL_LOG` if present and valid, else `config.level`.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_FILTER_ENV) {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| GridpoolError::Configuration(format!("invalid log level {:?}: {e}", config.level)))
}

/// Installs the global fmt subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match (config.json_output, config.include_timestamps) {
        (true, true) => builder.json().try_init(),
        (true, false) => builder.json().without_time().try_init(),
        (false, true) => builder.try_init(),
        (false, false) => builder.without_time().try_init(),
    };
    installed.map_err(|e| GridpoolError::Configuration(format!("logging init failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_from_level() {
        let config = LoggingConfig {
            level: "debug".into(),
            ..LoggingConfig::default()
        };
        assert!(env_filter(&config).is_ok());
    }

    #[test]
    fn second_init_fails() {
        let config = LoggingConfig::default();
        // The first call may lose to another test that already installed a subscriber.
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
