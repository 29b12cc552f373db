//! Console logging for the command line client.
//!
//! Log lines go to stderr so command output on stdout stays machine
//! readable. `RUST_LOG` takes precedence over the configured level.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Logging configuration for the client.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Console log level
    pub level: Level,
    /// Include the event target (module path) in each line
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            with_target: false,
        }
    }
}

impl LoggingConfig {
    /// Create from application configuration.
    ///
    /// Unknown level names fall back to `info`.
    pub fn from_config(level: &str, verbose: bool) -> Self {
        let level = if verbose {
            Level::DEBUG
        } else {
            level.parse().unwrap_or(Level::INFO)
        };

        Self {
            level,
            with_target: verbose,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
    }
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let console_layer = fmt::layer()
        .with_target(config.with_target)
        .with_writer(std::io::stderr);

    Registry::default()
        .with(config.filter())
        .with(console_layer)
        .try_init()?;

    Ok(())
}
