//! Logging setup
//!
//! Installs a global `tracing` subscriber. `RUST_LOG` wins over the
//! configured level when it is set.

use std::env;

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is absent, e.g. `info` or `fedra_time=debug`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Include the event target (module path)
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".into(),
            json: false,
            with_target: true,
        }
    }
}

impl LogConfig {
    /// Reads `FEDRA_LOG_LEVEL` and `FEDRA_JSON_LOGS`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(level) = env::var("FEDRA_LOG_LEVEL") {
            config.level = level;
        }
        if let Ok(json) = env::var("FEDRA_JSON_LOGS") {
            config.json = matches!(json.trim().to_lowercase().as_str(), "true" | "1" | "yes");
        }
        config
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Install the global subscriber
///
/// Fails rather than panics when a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| LoggingError::Filter(e.to_string()))?;

    if config.json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(config.with_target)
            .with_thread_ids(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;
    } else {
        let layer = tracing_subscriber::fmt::layer().with_target(config.with_target);
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;
    }

    tracing::debug!(level = %config.level, json = config.json, "logging initialized");
    Ok(())
}
