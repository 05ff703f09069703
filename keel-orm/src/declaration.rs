//! Declarative entity descriptions: what `#[derive(Entity)]` emits and what
//! the metadata compiler reads.

use serde::{Deserialize, Serialize};

use crate::mapping::{IndexType, RelationKind};

/// Marks a class as a persisted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAttribute {
    pub table: String,
    pub comment: Option<String>,
}

/// Column mapping of a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAttribute {
    /// Column name; defaults to the property name.
    pub name: Option<String>,
    pub type_name: String,
    pub length: Option<u32>,
    pub primary: bool,
    pub index: Option<IndexType>,
    pub enum_values: Option<Vec<String>>,
    pub serialize: bool,
    pub nullable: bool,
}

impl FieldAttribute {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            name: None,
            type_name: type_name.into(),
            length: None,
            primary: false,
            index: None,
            enum_values: None,
            serialize: true,
            nullable: false,
        }
    }

    pub fn name(mut self, column: impl Into<String>) -> Self {
        self.name = Some(column.into());
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn index(mut self, kind: IndexType) -> Self {
        self.index = Some(kind);
        self
    }

    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Keep the field out of serialized results.
    pub fn hidden(mut self) -> Self {
        self.serialize = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// The property to synthesize on the other side of a one-sided relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InverseRelationSpec {
    pub property: String,
    /// Kind of the synthesized relation; derived from the declared kind when absent.
    pub kind: Option<RelationKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationAttribute {
    pub kind: RelationKind,
    /// Target class name.
    pub target: String,
    /// Linking column on the target side.
    pub joining_field: Option<String>,
    /// Linking column on the declaring side.
    pub current_field: Option<String>,
    pub inverse: Option<InverseRelationSpec>,
}

impl RelationAttribute {
    pub fn new(kind: RelationKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            joining_field: None,
            current_field: None,
            inverse: None,
        }
    }

    pub fn joining_field(mut self, column: impl Into<String>) -> Self {
        self.joining_field = Some(column.into());
        self
    }

    pub fn current_field(mut self, column: impl Into<String>) -> Self {
        self.current_field = Some(column.into());
        self
    }

    pub fn inverse(mut self, property: impl Into<String>) -> Self {
        self.inverse = Some(InverseRelationSpec {
            property: property.into(),
            kind: None,
        });
        self
    }

    pub fn inverse_as(mut self, property: impl Into<String>, kind: RelationKind) -> Self {
        self.inverse = Some(InverseRelationSpec {
            property: property.into(),
            kind: Some(kind),
        });
        self
    }
}

/// A class-level index over one or more properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexAttribute {
    pub fields: Vec<String>,
    pub kind: IndexType,
}

impl IndexAttribute {
    pub fn new<I, S>(fields: I, kind: IndexType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDeclaration {
    pub name: String,
    pub field: Option<FieldAttribute>,
    pub relation: Option<RelationAttribute>,
}

impl PropertyDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: None,
            relation: None,
        }
    }

    pub fn with_field(mut self, field: FieldAttribute) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_relation(mut self, relation: RelationAttribute) -> Self {
        self.relation = Some(relation);
        self
    }
}

/// Everything declared about one class, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDeclaration {
    pub class: String,
    pub entity: Option<EntityAttribute>,
    pub properties: Vec<PropertyDeclaration>,
    pub indexes: Vec<IndexAttribute>,
}

impl EntityDeclaration {
    /// A declaration without the entity attribute.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            entity: None,
            properties: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn entity(class: impl Into<String>, table: impl Into<String>) -> Self {
        let mut declaration = Self::new(class);
        declaration.entity = Some(EntityAttribute {
            table: table.into(),
            comment: None,
        });
        declaration
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        if let Some(entity) = self.entity.as_mut() {
            entity.comment = Some(comment.into());
        }
        self
    }

    /// Map a property to a column, merging with an existing property declaration.
    pub fn field(mut self, property: &str, field: FieldAttribute) -> Self {
        self.property_mut(property).field = Some(field);
        self
    }

    /// Declare a relation, merging with an existing property declaration.
    pub fn relation(mut self, property: &str, relation: RelationAttribute) -> Self {
        self.property_mut(property).relation = Some(relation);
        self
    }

    pub fn property(mut self, property: PropertyDeclaration) -> Self {
        self.properties.push(property);
        self
    }

    pub fn index(mut self, index: IndexAttribute) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn property_named(&self, name: &str) -> Option<&PropertyDeclaration> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn property_mut(&mut self, name: &str) -> &mut PropertyDeclaration {
        match self.properties.iter().position(|p| p.name == name) {
            Some(i) => &mut self.properties[i],
            None => {
                self.properties.push(PropertyDeclaration::new(name));
                let last = self.properties.len() - 1;
                &mut self.properties[last]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_and_relation_merge_on_one_property() {
        let declaration = EntityDeclaration::entity("Post", "post")
            .field("user_id", FieldAttribute::new("int"))
            .relation("user_id", RelationAttribute::new(RelationKind::BelongsTo, "User"));
        assert_eq!(declaration.properties.len(), 1);
        let property = declaration.property_named("user_id").unwrap();
        assert!(property.field.is_some());
        assert!(property.relation.is_some());
    }

    #[test]
    fn comment_requires_entity_attribute() {
        let plain = EntityDeclaration::new("Helper").comment("ignored");
        assert!(plain.entity.is_none());
        let entity = EntityDeclaration::entity("User", "user").comment("accounts");
        assert_eq!(entity.entity.unwrap().comment.as_deref(), Some("accounts"));
    }
}
