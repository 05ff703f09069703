//! Entity discovery and attribute reading.

use std::collections::HashMap;
use std::sync::Arc;

use crate::declaration::{
    EntityAttribute, EntityDeclaration, FieldAttribute, IndexAttribute, PropertyDeclaration,
    RelationAttribute,
};
use crate::entity::Entity;
use crate::error::MappingError;

/// The set of classes known to the ORM.
///
/// Class names are kept in discovery order, which is the order metadata is
/// compiled in. A class can be discovered before (or without) its
/// declaration; compiling such a class fails with
/// [`MappingError::ClassNotFound`].
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    discovered: Vec<String>,
    declarations: HashMap<String, Arc<EntityDeclaration>>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover and declare a typed entity.
    pub fn register<T: Entity>(&mut self) -> &mut Self {
        self.declare(T::declaration())
    }

    pub fn declare(&mut self, declaration: EntityDeclaration) -> &mut Self {
        self.discover(declaration.class.clone());
        self.declarations
            .insert(declaration.class.clone(), Arc::new(declaration));
        self
    }

    /// Record a class name without a declaration.
    pub fn discover(&mut self, class: impl Into<String>) -> &mut Self {
        let class = class.into();
        if !self.discovered.contains(&class) {
            self.discovered.push(class);
        }
        self
    }

    pub fn classes(&self) -> &[String] {
        &self.discovered
    }

    pub fn declaration(&self, class: &str) -> Option<Arc<EntityDeclaration>> {
        self.declarations.get(class).cloned()
    }

    /// Resolve a class name to its declaration.
    pub fn reflect(&self, class: &str) -> Result<Arc<EntityDeclaration>, MappingError> {
        self.declaration(class)
            .ok_or_else(|| MappingError::ClassNotFound(class.to_string()))
    }
}

/// The entity attribute of a declaration, required for anything persisted.
pub fn entity_attribute(declaration: &EntityDeclaration) -> Result<&EntityAttribute, MappingError> {
    declaration
        .entity
        .as_ref()
        .ok_or_else(|| MappingError::NotAnEntity(declaration.class.clone()))
}

pub fn field_attributes(
    declaration: &EntityDeclaration,
) -> impl Iterator<Item = (&PropertyDeclaration, &FieldAttribute)> {
    declaration
        .properties
        .iter()
        .filter_map(|p| p.field.as_ref().map(|f| (p, f)))
}

pub fn relation_attributes(
    declaration: &EntityDeclaration,
) -> impl Iterator<Item = (&PropertyDeclaration, &RelationAttribute)> {
    declaration
        .properties
        .iter()
        .filter_map(|p| p.relation.as_ref().map(|r| (p, r)))
}

pub fn index_attributes(declaration: &EntityDeclaration) -> &[IndexAttribute] {
    &declaration.indexes
}
