use serde::{Deserialize, Serialize};

use super::{connection_key, EntitiesConnection, Field, Index, IndexType, Relation};
use crate::error::MappingError;

/// The frozen physical description of an entity's table.
///
/// Only [`EntityBuilder::build`] produces one, and it guarantees exactly one
/// primary key field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub class: String,
    /// Logical table name, as declared.
    pub name: String,
    /// Physical table name: configured prefix + logical name.
    pub table: String,
    pub comment: Option<String>,
    pub fields: Vec<Field>,
    pub indexes: Vec<Index>,
    pub connections: Vec<EntitiesConnection>,
    /// Synthesized by relation resolution (junction entities).
    pub synthetic: bool,
    primary_key: usize,
}

impl EntityDefinition {
    pub fn primary_field(&self) -> &Field {
        &self.fields[self.primary_key]
    }

    /// Find a field by property name, then by column name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.property == name)
            .or_else(|| self.field_by_column(name))
    }

    pub fn field_by_column(&self, column: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.column == column)
    }

    pub fn property_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.property.clone()).collect()
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn connection_to(&self, class: &str) -> Option<&EntitiesConnection> {
        let key = connection_key(&[self.class.as_str(), class]);
        self.connections.iter().find(|c| c.key() == key)
    }

    /// Every relation rendered on this entity.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> + '_ {
        self.connections
            .iter()
            .flat_map(move |c| c.relations_of(&self.class))
    }

    pub fn relation(&self, property: &str) -> Option<&Relation> {
        self.relations().find(|r| r.property == property)
    }
}

/// Mutable form of an [`EntityDefinition`], used while compiling metadata.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    class: String,
    name: String,
    table: String,
    comment: Option<String>,
    fields: Vec<Field>,
    indexes: Vec<Index>,
    connections: Vec<EntitiesConnection>,
    synthetic: bool,
    dirty: bool,
}

impl EntityBuilder {
    pub fn new(class: impl Into<String>, name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            table: table.into(),
            comment: None,
            fields: Vec::new(),
            indexes: Vec::new(),
            connections: Vec::new(),
            synthetic: false,
            dirty: true,
        }
    }

    /// Reopen a cached definition. The builder starts clean: it only needs
    /// saving again if something modifies it.
    pub fn from_definition(definition: &EntityDefinition) -> Self {
        Self {
            class: definition.class.clone(),
            name: definition.name.clone(),
            table: definition.table.clone(),
            comment: definition.comment.clone(),
            fields: definition.fields.clone(),
            indexes: definition.indexes.clone(),
            connections: definition.connections.clone(),
            synthetic: definition.synthetic,
            dirty: false,
        }
    }

    pub fn comment(&mut self, comment: Option<String>) -> &mut Self {
        self.comment = comment;
        self
    }

    pub fn synthetic(&mut self) -> &mut Self {
        self.synthetic = true;
        self
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_by_column(&self, column: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.column == column)
    }

    pub fn field_by_property(&self, property: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.property == property)
    }

    pub fn primary_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary)
    }

    pub fn add_field(&mut self, field: Field) -> Result<&mut Self, MappingError> {
        if self.field_by_column(&field.column).is_some() {
            return Err(MappingError::DuplicateColumn {
                class: self.class.clone(),
                column: field.column,
            });
        }
        if field.primary {
            if let Some(existing) = self.primary_field() {
                return Err(MappingError::MultiplePrimaryKeys {
                    class: self.class.clone(),
                    fields: vec![existing.property.clone(), field.property],
                });
            }
        }
        self.fields.push(field);
        self.dirty = true;
        Ok(self)
    }

    /// Add an index; an index with the same name is kept as is.
    pub fn add_index(&mut self, index: Index) -> &mut Self {
        if !self.indexes.iter().any(|i| i.name == index.name) {
            self.indexes.push(index);
            self.dirty = true;
        }
        self
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Attach a connection, replacing one with the same key.
    pub fn add_connection(&mut self, connection: EntitiesConnection) -> &mut Self {
        let key = connection.key();
        match self.connections.iter().position(|c| c.key() == key) {
            Some(i) if self.connections[i] == connection => {}
            Some(i) => {
                self.connections[i] = connection;
                self.dirty = true;
            }
            None => {
                self.connections.push(connection);
                self.dirty = true;
            }
        }
        self
    }

    pub fn connections(&self) -> &[EntitiesConnection] {
        &self.connections
    }

    /// Freeze the builder, checking that exactly one primary key exists.
    pub fn build(self) -> Result<EntityDefinition, MappingError> {
        let primaries: Vec<usize> = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.primary)
            .map(|(i, _)| i)
            .collect();
        let primary_key = match primaries.as_slice() {
            [single] => *single,
            [] => return Err(MappingError::MissingPrimaryKey(self.class)),
            many => {
                return Err(MappingError::MultiplePrimaryKeys {
                    fields: many.iter().map(|i| self.fields[*i].property.clone()).collect(),
                    class: self.class,
                })
            }
        };
        let mut indexes = self.indexes;
        if !indexes.iter().any(|i| i.kind == IndexType::Primary) {
            indexes.insert(
                0,
                Index::new(
                    "PRIMARY",
                    IndexType::Primary,
                    vec![self.fields[primary_key].column.clone()],
                ),
            );
        }
        Ok(EntityDefinition {
            class: self.class,
            name: self.name,
            table: self.table,
            comment: self.comment,
            fields: self.fields,
            indexes,
            connections: self.connections,
            synthetic: self.synthetic,
            primary_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> EntityBuilder {
        let mut b = EntityBuilder::new("User", "user", "app_user");
        b.add_field(Field::auto_id("id", crate::mapping::FieldSource::Declared)).unwrap();
        b.add_field(Field::new("email", "string")).unwrap();
        b
    }

    #[test]
    fn build_requires_a_primary_key() {
        let mut b = EntityBuilder::new("Tag", "tag", "tag");
        b.add_field(Field::new("label", "string")).unwrap();
        assert_eq!(b.build().unwrap_err(), MappingError::MissingPrimaryKey("Tag".into()));
    }

    #[test]
    fn second_primary_key_is_rejected() {
        let mut b = builder();
        let mut other = Field::new("uuid", "uuid");
        other.primary = true;
        assert!(matches!(
            b.add_field(other),
            Err(MappingError::MultiplePrimaryKeys { .. })
        ));
    }

    #[test]
    fn duplicate_column_is_rejected() {
        let mut b = builder();
        let mut alias = Field::new("mail", "string");
        alias.column = "email".into();
        assert!(matches!(b.add_field(alias), Err(MappingError::DuplicateColumn { .. })));
    }

    #[test]
    fn build_adds_primary_index_and_resolves_fields() {
        let def = builder().build().unwrap();
        assert_eq!(def.primary_field().property, "id");
        assert_eq!(def.indexes[0].name, "PRIMARY");
        assert_eq!(def.field("email").map(|f| f.column.as_str()), Some("email"));
        assert!(def.field("missing").is_none());
    }

    #[test]
    fn thawed_builder_is_clean_until_modified() {
        let def = builder().build().unwrap();
        let mut thawed = EntityBuilder::from_definition(&def);
        assert!(!thawed.is_dirty());
        thawed.add_index(def.indexes[0].clone());
        assert!(!thawed.is_dirty());
        thawed.add_field(Field::new("name", "string")).unwrap();
        assert!(thawed.is_dirty());
    }
}
