use keel_core::config::{ConfigError, ConfigValue, KeelConfig};
use keel_core::{ConfigProperties, LogFormat, LoggingConfig};
use serial_test::serial;

#[test]
fn test_empty_config() {
    let config = KeelConfig::empty();
    assert!(matches!(
        config.get::<String>("nonexistent"),
        Err(ConfigError::NotFound(_))
    ));
}

#[test]
fn test_set_and_get() {
    let mut config = KeelConfig::empty();
    config.set("orm.table.prefix", ConfigValue::String("app_".into()));
    assert_eq!(config.get::<String>("orm.table.prefix").unwrap(), "app_");
}

#[test]
fn test_get_or_default_only_for_missing_keys() {
    let mut config = KeelConfig::empty();
    assert_eq!(config.get_or("missing", 42i64).unwrap(), 42);

    config.set("bad", ConfigValue::String("not a number".into()));
    assert!(matches!(
        config.get_or("bad", 1i64),
        Err(ConfigError::TypeMismatch { .. })
    ));
}

#[test]
fn test_type_conversions() {
    let mut config = KeelConfig::empty();
    config.set("int_val", ConfigValue::Integer(42));
    config.set("float_val", ConfigValue::Float(2.5));
    config.set("bool_val", ConfigValue::String("yes".into()));
    config.set("null_val", ConfigValue::Null);
    config.set("list_val", ConfigValue::String("a, b,c".into()));

    assert_eq!(config.get::<i64>("int_val").unwrap(), 42);
    assert_eq!(config.get::<u16>("int_val").unwrap(), 42);
    assert_eq!(config.get::<f64>("float_val").unwrap(), 2.5);
    assert!(config.get::<bool>("bool_val").unwrap());
    assert_eq!(config.get::<String>("int_val").unwrap(), "42");
    assert!(config.get::<Option<String>>("null_val").unwrap().is_none());
    assert_eq!(
        config.get::<Vec<String>>("list_val").unwrap(),
        vec!["a", "b", "c"]
    );
}

#[test]
fn test_flatten_yaml() {
    let yaml = r#"
orm:
  table:
    prefix: "app_"
    engine: InnoDB
  dialect: sqlite
  entities:
    - User
    - Post
"#;
    let config = KeelConfig::from_yaml_str(yaml, "test").unwrap();

    assert_eq!(config.get::<String>("orm.table.prefix").unwrap(), "app_");
    assert_eq!(config.get::<String>("orm.table.engine").unwrap(), "InnoDB");
    assert_eq!(config.get::<String>("orm.dialect").unwrap(), "sqlite");
    assert_eq!(
        config.get::<Vec<String>>("orm.entities").unwrap(),
        vec!["User", "Post"]
    );
    assert_eq!(config.get::<String>("orm.entities.1").unwrap(), "Post");
}

#[test]
fn test_invalid_yaml_is_a_load_error() {
    let err = KeelConfig::from_yaml_str("orm: [unclosed", "test").unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_typed_logging_section() {
    let config = KeelConfig::from_yaml_str("logging:\n  format: json\n  filter: debug\n", "test")
        .unwrap()
        .with_typed::<LoggingConfig>()
        .unwrap();
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.filter, "debug");
    assert_eq!(LoggingConfig::prefix(), "logging");

    let defaults = LoggingConfig::from_config(&KeelConfig::empty()).unwrap();
    assert_eq!(defaults, LoggingConfig::default());
}

#[test]
fn test_unknown_log_format() {
    let config = KeelConfig::from_yaml_str("logging:\n  format: xml\n", "test").unwrap();
    assert!(LoggingConfig::from_config(&config).is_err());
}

#[test]
#[serial]
fn test_load_from_directory_with_profile_and_env_overlay() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("application.yaml"),
        "orm:\n  table:\n    prefix: base_\n    engine: InnoDB\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("application-prod.yaml"),
        "orm:\n  table:\n    prefix: prod_\n",
    )
    .unwrap();

    std::env::remove_var("KEEL_PROFILE");
    std::env::set_var("ORM_TABLE_ENGINE", "Aria");
    let config = KeelConfig::load_from(dir.path(), "prod").unwrap();
    std::env::remove_var("ORM_TABLE_ENGINE");

    assert_eq!(config.profile(), "prod");
    assert_eq!(config.get::<String>("orm.table.prefix").unwrap(), "prod_");
    assert_eq!(config.get::<String>("orm.table.engine").unwrap(), "Aria");
}

#[test]
#[serial]
fn test_profile_env_var_wins() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("KEEL_PROFILE", "staging");
    let config = KeelConfig::load_from(dir.path(), "dev").unwrap();
    std::env::remove_var("KEEL_PROFILE");
    assert_eq!(config.profile(), "staging");
}
