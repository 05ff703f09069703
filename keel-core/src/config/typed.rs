use super::{ConfigError, KeelConfig};

/// A strongly-typed configuration section.
///
/// ```ignore
/// impl ConfigProperties for OrmConfig {
///     fn prefix() -> &'static str { "orm" }
///     fn from_config(config: &KeelConfig) -> Result<Self, ConfigError> {
///         Ok(Self { table_prefix: config.get_or("orm.table.prefix", String::new())?, .. })
///     }
/// }
/// ```
pub trait ConfigProperties: Sized {
    /// The configuration key prefix (e.g. `"orm"`).
    fn prefix() -> &'static str;

    fn from_config(config: &KeelConfig) -> Result<Self, ConfigError>;
}
