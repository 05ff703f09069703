//! # keel-core: shared runtime pieces for Keel
//!
//! Configuration loading ([`KeelConfig`]) and tracing bootstrap
//! ([`init_tracing`]). The ORM crates read their settings through the
//! [`ConfigProperties`] trait defined here.

pub mod config;
pub mod logging;

pub use config::{ConfigError, ConfigProperties, ConfigValue, FromConfigValue, KeelConfig};
pub use logging::{init_tracing, LogFormat, LoggingConfig};
