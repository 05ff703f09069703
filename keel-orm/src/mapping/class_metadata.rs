use serde::{Deserialize, Serialize};

use super::EntityDefinition;
use crate::declaration::EntityDeclaration;

/// Compiled metadata of one class: its table definition plus the declaration
/// it was compiled from.
///
/// Junction entities have no declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetadata {
    entity: EntityDefinition,
    declaration: Option<EntityDeclaration>,
}

impl ClassMetadata {
    pub fn new(entity: EntityDefinition, declaration: Option<EntityDeclaration>) -> Self {
        Self {
            entity,
            declaration,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.entity.class
    }

    pub fn entity(&self) -> &EntityDefinition {
        &self.entity
    }

    pub fn declaration(&self) -> Option<&EntityDeclaration> {
        self.declaration.as_ref()
    }

    pub fn is_synthetic(&self) -> bool {
        self.entity.synthetic
    }
}
