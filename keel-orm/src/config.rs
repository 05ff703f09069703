use keel_core::{ConfigError, ConfigProperties, KeelConfig};

use crate::query::Dialect;

/// ORM settings, read from the `orm` configuration section.
///
/// ```yaml
/// orm:
///   dialect: sqlite
///   table:
///     prefix: app_
///     engine: InnoDB
///   schema:
///     prune: false
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OrmConfig {
    /// Prepended to every logical table name.
    pub table_prefix: String,
    /// Storage engine named in MySQL `CREATE TABLE` statements.
    pub engine: String,
    pub dialect: Dialect,
    /// Drop columns and indexes that no longer appear in the metadata when
    /// synchronizing tables.
    pub drop_non_existing: bool,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            engine: "InnoDB".to_string(),
            dialect: Dialect::MySql,
            drop_non_existing: false,
        }
    }
}

impl ConfigProperties for OrmConfig {
    fn prefix() -> &'static str {
        "orm"
    }

    fn from_config(config: &KeelConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let dialect = match config.get_or::<Option<String>>("orm.dialect", None)? {
            Some(raw) => raw.parse().map_err(|_| ConfigError::TypeMismatch {
                key: "orm.dialect".to_string(),
                expected: "one of mysql, sqlite, postgres, generic",
            })?,
            None => defaults.dialect,
        };
        Ok(Self {
            table_prefix: config.get_or("orm.table.prefix", defaults.table_prefix)?,
            engine: config.get_or("orm.table.engine", defaults.engine)?,
            dialect,
            drop_non_existing: config.get_or("orm.schema.prune", defaults.drop_non_existing)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let config = OrmConfig::from_config(&KeelConfig::empty()).unwrap();
        assert_eq!(config, OrmConfig::default());
    }

    #[test]
    fn reads_the_orm_section() {
        let yaml = "orm:\n  dialect: sqlite\n  table:\n    prefix: app_\n  schema:\n    prune: yes\n";
        let config = KeelConfig::from_yaml_str(yaml, "test")
            .unwrap()
            .with_typed::<OrmConfig>()
            .unwrap();
        assert_eq!(config.table_prefix, "app_");
        assert_eq!(config.dialect, Dialect::Sqlite);
        assert_eq!(config.engine, "InnoDB");
        assert!(config.drop_non_existing);
    }

    #[test]
    fn unknown_dialect_is_rejected() {
        let config = KeelConfig::from_yaml_str("orm:\n  dialect: oracle\n", "test").unwrap();
        assert!(matches!(
            OrmConfig::from_config(&config),
            Err(ConfigError::TypeMismatch { .. })
        ));
    }
}
