//! Type transformers: conversion between application values and stored values.

mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

pub use builtin::{
    BoolType, DateTimeType, EnumType, FloatType, IntType, JsonType, StringType, UnknownType,
    UuidType,
};

use crate::error::MappingError;
use crate::mapping::Field;
use crate::value::Value;

/// Error raised when a value cannot be converted by a type transformer.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeError {
    Incompatible {
        type_name: String,
        field: String,
        found: &'static str,
    },
    InvalidEnumValue {
        field: String,
        value: String,
        allowed: Vec<String>,
    },
    Parse {
        type_name: String,
        field: String,
        value: String,
    },
}

impl TypeError {
    /// Attach the property name when the conversion happened outside a field context.
    pub fn for_field(self, property: &str) -> Self {
        match self {
            TypeError::Incompatible { type_name, found, .. } => TypeError::Incompatible {
                type_name,
                field: property.to_string(),
                found,
            },
            TypeError::Parse { type_name, value, .. } => TypeError::Parse {
                type_name,
                field: property.to_string(),
                value,
            },
            other => other,
        }
    }
}

impl std::fmt::Display for TypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeError::Incompatible {
                type_name,
                field,
                found,
            } => write!(f, "Field '{field}' of type {type_name} cannot hold a {found} value"),
            TypeError::InvalidEnumValue {
                field,
                value,
                allowed,
            } => write!(
                f,
                "Value '{value}' is not allowed for field '{field}' (allowed: {})",
                allowed.join(", ")
            ),
            TypeError::Parse {
                type_name,
                field,
                value,
            } => write!(f, "Field '{field}': cannot parse '{value}' as {type_name}"),
        }
    }
}

impl std::error::Error for TypeError {}

/// Storage affinity of a column, used by dialects without rich column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageClass {
    pub fn as_sql(self) -> &'static str {
        match self {
            StorageClass::Integer => "INTEGER",
            StorageClass::Real => "REAL",
            StorageClass::Text => "TEXT",
            StorageClass::Blob => "BLOB",
        }
    }
}

/// A named, bidirectional value transformer.
///
/// Implementations never see [`Value::Null`]: the registry passes nulls
/// through untouched in both directions.
pub trait TypeInterface: Send + Sync + 'static {
    /// Logical type name referenced by field declarations (`"int"`, `"json"`).
    fn name(&self) -> &str;

    /// Convert a stored value into its application form.
    fn to_app_value(&self, value: Value, field: &Field) -> Result<Value, TypeError>;

    /// Convert an application value into its stored form.
    fn to_database_value(&self, value: Value, field: &Field) -> Result<Value, TypeError>;

    /// Column type in the MySQL-flavoured DDL (`VARCHAR(255)`, `INT(11)`).
    fn sql_declaration(&self, field: &Field) -> String;

    fn storage_class(&self) -> StorageClass;
}

/// Registry of type transformers, keyed by logical name.
#[derive(Clone)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<dyn TypeInterface>>,
    unknown: Arc<dyn TypeInterface>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TypeRegistry {
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
            unknown: Arc::new(UnknownType),
        }
    }

    /// Registry pre-populated with the built-in types.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        let builtins: Vec<Arc<dyn TypeInterface>> = vec![
            Arc::new(StringType::varchar()),
            Arc::new(StringType::text()),
            Arc::new(StringType::longtext()),
            Arc::new(IntType),
            Arc::new(FloatType::new("float")),
            Arc::new(FloatType::new("double")),
            Arc::new(FloatType::new("big_float")),
            Arc::new(BoolType),
            Arc::new(DateTimeType::new("datetime", "DATETIME")),
            Arc::new(DateTimeType::new("time", "TIME")),
            Arc::new(DateTimeType::new("timestamp", "TIMESTAMP")),
            Arc::new(JsonType),
            Arc::new(UuidType),
            Arc::new(EnumType),
        ];
        for ty in builtins {
            registry.types.insert(ty.name().to_string(), ty);
        }
        registry
    }

    /// Register a transformer. Two transformers sharing a logical name is a
    /// configuration error.
    pub fn register(&mut self, ty: impl TypeInterface) -> Result<(), MappingError> {
        self.register_arc(Arc::new(ty))
    }

    pub fn register_arc(&mut self, ty: Arc<dyn TypeInterface>) -> Result<(), MappingError> {
        let name = ty.name().to_string();
        if self.types.contains_key(&name) {
            return Err(MappingError::DuplicateType(name));
        }
        self.types.insert(name, ty);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Look up a transformer; unknown names resolve to a passthrough type.
    pub fn get(&self, name: &str) -> &dyn TypeInterface {
        self.types
            .get(name)
            .unwrap_or(&self.unknown)
            .as_ref()
    }

    pub fn to_database_value(&self, field: &Field, value: Value) -> Result<Value, TypeError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        self.get(&field.type_name).to_database_value(value, field)
    }

    pub fn to_app_value(&self, field: &Field, value: Value) -> Result<Value, TypeError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        self.get(&field.type_name).to_app_value(value, field)
    }

    pub fn sql_declaration(&self, field: &Field) -> String {
        self.get(&field.type_name).sql_declaration(field)
    }

    pub fn storage_class(&self, field: &Field) -> StorageClass {
        self.get(&field.type_name).storage_class()
    }
}
