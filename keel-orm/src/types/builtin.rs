use chrono::DateTime;
use uuid::Uuid;

use super::{StorageClass, TypeError, TypeInterface};
use crate::mapping::Field;
use crate::value::{parse_datetime, Value, DATETIME_FORMAT};

fn incompatible(ty: &str, field: &Field, value: &Value) -> TypeError {
    TypeError::Incompatible {
        type_name: ty.to_string(),
        field: field.property.clone(),
        found: value.kind(),
    }
}

fn unparsable(ty: &str, field: &Field, raw: &str) -> TypeError {
    TypeError::Parse {
        type_name: ty.to_string(),
        field: field.property.clone(),
        value: raw.to_string(),
    }
}

/// Textual columns: `string` (VARCHAR), `text` and `longtext`.
#[derive(Debug, Clone)]
pub struct StringType {
    name: &'static str,
    column: &'static str,
    sized: bool,
}

impl StringType {
    pub fn varchar() -> Self {
        Self {
            name: "string",
            column: "VARCHAR",
            sized: true,
        }
    }

    pub fn text() -> Self {
        Self {
            name: "text",
            column: "TEXT",
            sized: false,
        }
    }

    pub fn longtext() -> Self {
        Self {
            name: "longtext",
            column: "LONGTEXT",
            sized: false,
        }
    }

    fn convert(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        match value {
            Value::String(_) => Ok(value),
            Value::Int(_) | Value::Float(_) | Value::Bool(_) | Value::Uuid(_) | Value::DateTime(_) => {
                Ok(Value::String(value.to_string()))
            }
            other => Err(incompatible(self.name, field, &other)),
        }
    }
}

impl TypeInterface for StringType {
    fn name(&self) -> &str {
        self.name
    }

    fn to_app_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        self.convert(value, field)
    }

    fn to_database_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        self.convert(value, field)
    }

    fn sql_declaration(&self, field: &Field) -> String {
        if self.sized {
            format!("{}({})", self.column, field.length.unwrap_or(255))
        } else {
            self.column.to_string()
        }
    }

    fn storage_class(&self) -> StorageClass {
        StorageClass::Text
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IntType;

impl IntType {
    fn convert(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        match value {
            Value::Int(_) => Ok(value),
            Value::Bool(b) => Ok(Value::Int(i64::from(b))),
            Value::Float(f) if f.fract() == 0.0 => Ok(Value::Int(f as i64)),
            Value::String(ref s) => s
                .trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| unparsable("int", field, s)),
            other => Err(incompatible("int", field, &other)),
        }
    }
}

impl TypeInterface for IntType {
    fn name(&self) -> &str {
        "int"
    }

    fn to_app_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        self.convert(value, field)
    }

    fn to_database_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        self.convert(value, field)
    }

    fn sql_declaration(&self, field: &Field) -> String {
        format!("INT({})", field.length.unwrap_or(11))
    }

    fn storage_class(&self) -> StorageClass {
        StorageClass::Integer
    }
}

/// Floating point values, stored as text so no precision is lost in transit.
///
/// `f64`'s `Display` output is the shortest string that parses back to the
/// same number, so a value survives the round trip bit for bit.
#[derive(Debug, Clone)]
pub struct FloatType {
    name: &'static str,
}

impl FloatType {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl TypeInterface for FloatType {
    fn name(&self) -> &str {
        self.name
    }

    fn to_app_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        match value {
            Value::Float(_) => Ok(value),
            Value::Int(i) => Ok(Value::Float(i as f64)),
            Value::String(ref s) => s
                .trim()
                .parse()
                .map(Value::Float)
                .map_err(|_| unparsable(self.name, field, s)),
            other => Err(incompatible(self.name, field, &other)),
        }
    }

    fn to_database_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        match value {
            Value::Float(f) => Ok(Value::String(f.to_string())),
            Value::Int(i) => Ok(Value::String(i.to_string())),
            Value::String(ref s) => match s.trim().parse::<f64>() {
                Ok(f) => Ok(Value::String(f.to_string())),
                Err(_) => Err(unparsable(self.name, field, s)),
            },
            other => Err(incompatible(self.name, field, &other)),
        }
    }

    fn sql_declaration(&self, field: &Field) -> String {
        format!("VARCHAR({})", field.length.unwrap_or(64))
    }

    fn storage_class(&self) -> StorageClass {
        StorageClass::Text
    }
}

/// Booleans stored as `0`/`1`.
#[derive(Debug, Clone, Copy)]
pub struct BoolType;

impl TypeInterface for BoolType {
    fn name(&self) -> &str {
        "bool"
    }

    fn to_app_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        match value {
            Value::Bool(_) => Ok(value),
            Value::Int(i) => Ok(Value::Bool(i != 0)),
            Value::String(ref s) => match s.trim() {
                "1" | "true" => Ok(Value::Bool(true)),
                "0" | "false" => Ok(Value::Bool(false)),
                _ => Err(unparsable("bool", field, s)),
            },
            other => Err(incompatible("bool", field, &other)),
        }
    }

    fn to_database_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        match self.to_app_value(value, field)? {
            Value::Bool(b) => Ok(Value::Int(i64::from(b))),
            other => Err(incompatible("bool", field, &other)),
        }
    }

    fn sql_declaration(&self, _field: &Field) -> String {
        "TINYINT(1)".to_string()
    }

    fn storage_class(&self) -> StorageClass {
        StorageClass::Integer
    }
}

/// `datetime`, `time` and `timestamp`: stored in the canonical
/// `YYYY-MM-DD HH:MM:SS` form, exposed as [`Value::DateTime`].
#[derive(Debug, Clone)]
pub struct DateTimeType {
    name: &'static str,
    column: &'static str,
}

impl DateTimeType {
    pub fn new(name: &'static str, column: &'static str) -> Self {
        Self { name, column }
    }
}

impl TypeInterface for DateTimeType {
    fn name(&self) -> &str {
        self.name
    }

    fn to_app_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        match value {
            Value::DateTime(_) => Ok(value),
            Value::String(ref s) => parse_datetime(s)
                .map(Value::DateTime)
                .ok_or_else(|| unparsable(self.name, field, s)),
            other => Err(incompatible(self.name, field, &other)),
        }
    }

    fn to_database_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        let dt = match value {
            Value::DateTime(dt) => dt,
            Value::String(ref s) => parse_datetime(s).ok_or_else(|| unparsable(self.name, field, s))?,
            Value::Int(secs) => DateTime::from_timestamp(secs, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| unparsable(self.name, field, &secs.to_string()))?,
            other => return Err(incompatible(self.name, field, &other)),
        };
        Ok(Value::String(dt.format(DATETIME_FORMAT).to_string()))
    }

    fn sql_declaration(&self, _field: &Field) -> String {
        self.column.to_string()
    }

    fn storage_class(&self) -> StorageClass {
        StorageClass::Text
    }
}

/// Arbitrary JSON documents, stored as their serialized text.
#[derive(Debug, Clone, Copy)]
pub struct JsonType;

impl TypeInterface for JsonType {
    fn name(&self) -> &str {
        "json"
    }

    fn to_app_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        match value {
            Value::Json(_) => Ok(value),
            Value::String(ref s) => serde_json::from_str(s)
                .map(Value::Json)
                .map_err(|_| unparsable("json", field, s)),
            other => Ok(Value::Json(other.to_json())),
        }
    }

    fn to_database_value(&self, value: Value, _field: &Field) -> Result<Value, TypeError> {
        let doc = match value {
            Value::Json(v) => v,
            other => other.to_json(),
        };
        Ok(Value::String(doc.to_string()))
    }

    fn sql_declaration(&self, _field: &Field) -> String {
        "JSON".to_string()
    }

    fn storage_class(&self) -> StorageClass {
        StorageClass::Text
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UuidType;

impl TypeInterface for UuidType {
    fn name(&self) -> &str {
        "uuid"
    }

    fn to_app_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        match value {
            Value::Uuid(_) => Ok(value),
            Value::String(ref s) => Uuid::parse_str(s)
                .map(Value::Uuid)
                .map_err(|_| unparsable("uuid", field, s)),
            other => Err(incompatible("uuid", field, &other)),
        }
    }

    fn to_database_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        match self.to_app_value(value, field)? {
            Value::Uuid(u) => Ok(Value::String(u.hyphenated().to_string())),
            other => Err(incompatible("uuid", field, &other)),
        }
    }

    fn sql_declaration(&self, _field: &Field) -> String {
        "CHAR(36)".to_string()
    }

    fn storage_class(&self) -> StorageClass {
        StorageClass::Text
    }
}

/// A string restricted to the field's `enum_values`.
#[derive(Debug, Clone, Copy)]
pub struct EnumType;

impl EnumType {
    fn check(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        let Value::String(s) = value else {
            return Err(incompatible("enum", field, &value));
        };
        match &field.enum_values {
            Some(allowed) if !allowed.contains(&s) => Err(TypeError::InvalidEnumValue {
                field: field.property.clone(),
                value: s,
                allowed: allowed.clone(),
            }),
            _ => Ok(Value::String(s)),
        }
    }
}

impl TypeInterface for EnumType {
    fn name(&self) -> &str {
        "enum"
    }

    fn to_app_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        self.check(value, field)
    }

    fn to_database_value(&self, value: Value, field: &Field) -> Result<Value, TypeError> {
        self.check(value, field)
    }

    fn sql_declaration(&self, field: &Field) -> String {
        format!("VARCHAR({})", field.length.unwrap_or(64))
    }

    fn storage_class(&self) -> StorageClass {
        StorageClass::Text
    }
}

/// Fallback for unregistered type names: values pass through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct UnknownType;

impl TypeInterface for UnknownType {
    fn name(&self) -> &str {
        "unknown"
    }

    fn to_app_value(&self, value: Value, _field: &Field) -> Result<Value, TypeError> {
        Ok(value)
    }

    fn to_database_value(&self, value: Value, _field: &Field) -> Result<Value, TypeError> {
        Ok(value)
    }

    fn sql_declaration(&self, _field: &Field) -> String {
        "TEXT".to_string()
    }

    fn storage_class(&self) -> StorageClass {
        StorageClass::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    fn round_trip(field: &Field, value: Value) -> Value {
        let registry = TypeRegistry::with_defaults();
        let stored = registry.to_database_value(field, value).unwrap();
        registry.to_app_value(field, stored).unwrap()
    }

    #[test]
    fn float_survives_text_storage() {
        let field = Field::new("ratio", "double");
        for x in [0.1_f64, 1.0 / 3.0, 123456789.123456789, -2.5e-7] {
            assert_eq!(round_trip(&field, Value::Float(x)), Value::Float(x));
        }
        let registry = TypeRegistry::with_defaults();
        assert_eq!(
            registry.to_database_value(&field, Value::Float(0.1)).unwrap(),
            Value::String("0.1".into())
        );
    }

    #[test]
    fn bool_is_stored_as_integer() {
        let field = Field::new("active", "bool");
        let registry = TypeRegistry::with_defaults();
        assert_eq!(
            registry.to_database_value(&field, Value::Bool(true)).unwrap(),
            Value::Int(1)
        );
        assert_eq!(round_trip(&field, Value::Bool(false)), Value::Bool(false));
    }

    #[test]
    fn datetime_uses_canonical_format() {
        let field = Field::new("created_at", "datetime");
        let registry = TypeRegistry::with_defaults();
        let dt = parse_datetime("2023-11-05 08:09:10").unwrap();
        assert_eq!(
            registry.to_database_value(&field, Value::DateTime(dt)).unwrap(),
            Value::String("2023-11-05 08:09:10".into())
        );
        assert_eq!(round_trip(&field, Value::DateTime(dt)), Value::DateTime(dt));
        assert!(registry
            .to_database_value(&field, Value::String("yesterday".into()))
            .is_err());
    }

    #[test]
    fn time_and_timestamp_share_the_datetime_storage() {
        let registry = TypeRegistry::with_defaults();
        let dt = parse_datetime("2024-02-29T23:59:58").unwrap();
        for (ty, column) in [("time", "TIME"), ("timestamp", "TIMESTAMP")] {
            let field = Field::new("at", ty);
            assert_eq!(registry.sql_declaration(&field), column);
            assert_eq!(
                registry.to_database_value(&field, Value::DateTime(dt)).unwrap(),
                Value::String("2024-02-29 23:59:58".into())
            );
            assert_eq!(round_trip(&field, Value::DateTime(dt)), Value::DateTime(dt));
        }

        let stamp = Field::new("seen_at", "timestamp");
        assert_eq!(
            registry.to_database_value(&stamp, Value::Int(1_700_000_000)).unwrap(),
            Value::String("2023-11-14 22:13:20".into())
        );
        assert!(registry.to_app_value(&stamp, Value::Bool(true)).is_err());
    }

    #[test]
    fn json_documents_round_trip() {
        let field = Field::new("payload", "json");
        let doc = serde_json::json!({"tags": ["a", "b"], "n": 3});
        assert_eq!(round_trip(&field, Value::Json(doc.clone())), Value::Json(doc));
    }

    #[test]
    fn uuid_is_stored_hyphenated() {
        let field = Field::new("token", "uuid");
        let id = Uuid::new_v4();
        assert_eq!(round_trip(&field, Value::Uuid(id)), Value::Uuid(id));
    }

    #[test]
    fn enum_rejects_values_outside_the_set() {
        let mut field = Field::new("status", "enum");
        field.enum_values = Some(vec!["active".into(), "banned".into()]);
        let registry = TypeRegistry::with_defaults();
        assert!(registry
            .to_database_value(&field, Value::String("active".into()))
            .is_ok());
        let err = registry
            .to_database_value(&field, Value::String("deleted".into()))
            .unwrap_err();
        assert!(matches!(err, TypeError::InvalidEnumValue { .. }));
    }

    #[test]
    fn declarations_honour_length() {
        let registry = TypeRegistry::with_defaults();
        let mut name = Field::new("name", "string");
        assert_eq!(registry.sql_declaration(&name), "VARCHAR(255)");
        name.length = Some(64);
        assert_eq!(registry.sql_declaration(&name), "VARCHAR(64)");
        assert_eq!(registry.sql_declaration(&Field::new("id", "int")), "INT(11)");
    }
}
