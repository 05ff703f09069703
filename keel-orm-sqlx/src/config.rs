use keel_core::{ConfigError, ConfigProperties, KeelConfig};

/// Connection settings, read from the `database` configuration section.
///
/// ```yaml
/// database:
///   url: sqlite://var/app.db?mode=rwc
///   max-connections: 5
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
        }
    }
}

impl ConfigProperties for DatabaseConfig {
    fn prefix() -> &'static str {
        "database"
    }

    fn from_config(config: &KeelConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            url: config.get_or("database.url", defaults.url)?,
            max_connections: config.get_or("database.max-connections", defaults.max_connections)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_database_section() {
        let yaml = "database:\n  url: sqlite://app.db\n  max-connections: 2\n";
        let config = KeelConfig::from_yaml_str(yaml, "test").unwrap();
        let db = DatabaseConfig::from_config(&config).unwrap();
        assert_eq!(db.url, "sqlite://app.db");
        assert_eq!(db.max_connections, 2);
    }

    #[test]
    fn defaults_to_an_in_memory_database() {
        let db = DatabaseConfig::from_config(&KeelConfig::empty()).unwrap();
        assert_eq!(db, DatabaseConfig::default());
    }
}
