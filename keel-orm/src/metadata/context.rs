use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::EntityCatalog;
use crate::config::OrmConfig;
use crate::declaration::EntityDeclaration;
use crate::error::MappingError;
use crate::mapping::{connection_key, EntitiesConnection, EntityBuilder, NamingStrategy};
use crate::registry::SchemaRegistry;

/// Mutable state of one compilation pass.
///
/// Holds the entity builders (nothing is visible in the registry until the
/// pass completes) and the connections created so far. Connection lookups see
/// both the pending set and the registry, so a pair is connected at most once.
pub struct CompilationContext<'a> {
    catalog: &'a EntityCatalog,
    registry: &'a SchemaRegistry,
    naming: &'a dyn NamingStrategy,
    config: &'a OrmConfig,
    builders: Vec<EntityBuilder>,
    pending: BTreeMap<String, EntitiesConnection>,
}

impl<'a> CompilationContext<'a> {
    pub fn new(
        catalog: &'a EntityCatalog,
        registry: &'a SchemaRegistry,
        naming: &'a dyn NamingStrategy,
        config: &'a OrmConfig,
    ) -> Self {
        Self {
            catalog,
            registry,
            naming,
            config,
            builders: Vec::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn naming(&self) -> &'a dyn NamingStrategy {
        self.naming
    }

    pub fn config(&self) -> &'a OrmConfig {
        self.config
    }

    pub fn declaration(&self, class: &str) -> Option<Arc<EntityDeclaration>> {
        self.catalog.declaration(class)
    }

    pub fn has_entities_connection(&self, classes: &[&str]) -> bool {
        self.pending.contains_key(&connection_key(classes))
            || self.registry.has_entities_connection(classes)
    }

    pub fn set_entities_connection(&mut self, connection: EntitiesConnection) {
        self.pending.insert(connection.key(), connection);
    }

    /// Add a builder, replacing one for the same class.
    pub fn insert_builder(&mut self, builder: EntityBuilder) {
        match self.builders.iter().position(|b| b.class() == builder.class()) {
            Some(i) => self.builders[i] = builder,
            None => self.builders.push(builder),
        }
    }

    pub fn has_builder(&self, class: &str) -> bool {
        self.builders.iter().any(|b| b.class() == class)
    }

    pub fn builder(&self, class: &str) -> Result<&EntityBuilder, MappingError> {
        self.builders
            .iter()
            .find(|b| b.class() == class)
            .ok_or_else(|| MappingError::EntityNotRegistered(class.to_string()))
    }

    pub fn builder_mut(&mut self, class: &str) -> Result<&mut EntityBuilder, MappingError> {
        self.builders
            .iter_mut()
            .find(|b| b.class() == class)
            .ok_or_else(|| MappingError::EntityNotRegistered(class.to_string()))
    }

    /// Classes of the pass, in insertion order.
    pub fn classes(&self) -> Vec<String> {
        self.builders.iter().map(|b| b.class().to_string()).collect()
    }

    /// Attach `connection` to every distinct class it names.
    pub fn attach(&mut self, connection: &EntitiesConnection, classes: &[&str]) -> Result<(), MappingError> {
        let mut seen: Vec<&str> = Vec::new();
        for class in classes {
            if seen.contains(class) {
                continue;
            }
            seen.push(class);
            self.builder_mut(class)?.add_connection(connection.clone());
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (Vec<EntityBuilder>, Vec<EntitiesConnection>) {
        (self.builders, self.pending.into_values().collect())
    }
}
