use serde::{Deserialize, Serialize};

use super::IndexType;

/// Where a field came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// Declared on the entity with a field attribute.
    Declared,
    /// Added by relation resolution to hold a foreign key.
    ForeignKey,
    /// Part of a synthesized junction entity.
    Junction,
}

/// A mapped column of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Property name on the entity.
    pub property: String,
    /// Column name in the table.
    pub column: String,
    /// Logical type name, resolved through the type registry.
    pub type_name: String,
    pub length: Option<u32>,
    pub enum_values: Option<Vec<String>>,
    pub nullable: bool,
    /// Per-field index marker.
    pub index: Option<IndexType>,
    pub primary: bool,
    pub auto_increment: bool,
    /// Whether the field is exposed when a result is serialized.
    pub serialize: bool,
    pub source: FieldSource,
}

impl Field {
    /// A declared, non-null field whose column is named after the property.
    pub fn new(property: impl Into<String>, type_name: impl Into<String>) -> Self {
        let property = property.into();
        Self {
            column: property.clone(),
            property,
            type_name: type_name.into(),
            length: None,
            enum_values: None,
            nullable: false,
            index: None,
            primary: false,
            auto_increment: false,
            serialize: true,
            source: FieldSource::Declared,
        }
    }

    /// A nullable, indexed integer column holding a reference to another entity.
    pub fn foreign_key(column: impl Into<String>, source: FieldSource) -> Self {
        let mut field = Self::new(column, "int");
        field.nullable = source == FieldSource::ForeignKey;
        field.index = Some(IndexType::Index);
        field.source = source;
        field
    }

    /// An auto-increment integer primary key.
    pub fn auto_id(column: impl Into<String>, source: FieldSource) -> Self {
        let mut field = Self::new(column, "int");
        field.primary = true;
        field.auto_increment = true;
        field.index = Some(IndexType::Primary);
        field.source = source;
        field
    }

    /// Whether `name` designates this field, by property or by column.
    pub fn answers_to(&self, name: &str) -> bool {
        self.property == name || self.column == name
    }
}
