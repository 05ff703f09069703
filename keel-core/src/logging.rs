//! Tracing bootstrap.
//!
//! The engine only emits `tracing` events; installing a subscriber is left to
//! the application, which can call [`init_tracing`] once at startup.

use std::str::FromStr;

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

use crate::config::{ConfigError, ConfigProperties, KeelConfig};

/// Output format of the console log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::TypeMismatch {
                key: "logging.format".into(),
                expected: "\"pretty\" or \"json\"",
            }),
        }
    }
}

/// `logging.*` configuration section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".into(),
        }
    }
}

impl ConfigProperties for LoggingConfig {
    fn prefix() -> &'static str {
        "logging"
    }

    fn from_config(config: &KeelConfig) -> Result<Self, ConfigError> {
        let format = match config.get_or::<Option<String>>("logging.format", None)? {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };
        Ok(Self {
            format,
            filter: config.get_or("logging.filter", "info".to_string())?,
        })
    }
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed (e.g. a second call in tests).
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false);
            Registry::default().with(env_filter).with(fmt_layer).try_init()
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false);
            Registry::default().with(env_filter).with(fmt_layer).try_init()
        }
    }
}
