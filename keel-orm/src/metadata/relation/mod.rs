//! Relation resolution strategies.
//!
//! Every relation property of every compiled class is offered to the factories
//! in order; the first one that supports it resolves it. A factory declines a
//! property once its class pair is connected, which is what keeps a relation
//! declared on both sides from being resolved twice.

mod many_to_many;
mod one_to_many;

pub use many_to_many::ManyToManyFactory;
pub use one_to_many::OneToManyFactory;

use super::CompilationContext;
use crate::catalog::relation_attributes;
use crate::declaration::{InverseRelationSpec, RelationAttribute};
use crate::error::MappingError;
use crate::mapping::RelationKind;

/// A relation property, as offered to the factories.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRef {
    pub class: String,
    pub property: String,
    pub relation: RelationAttribute,
    /// The property is also mapped to a column.
    pub field_backed: bool,
    /// Synthesized from an [`InverseRelationSpec`] rather than declared.
    pub inverse: bool,
}

impl PropertyRef {
    /// The property `spec` asks for on the target of `declared`.
    pub(crate) fn from_inverse(
        declared: &PropertyRef,
        spec: &InverseRelationSpec,
        kind: RelationKind,
    ) -> Self {
        Self {
            class: declared.relation.target.clone(),
            property: spec.property.clone(),
            relation: RelationAttribute::new(spec.kind.unwrap_or(kind), declared.class.clone()),
            field_backed: false,
            inverse: true,
        }
    }
}

/// Relation properties declared on `class`, in declaration order.
pub(crate) fn declared_relations(ctx: &CompilationContext<'_>, class: &str) -> Vec<PropertyRef> {
    let Some(declaration) = ctx.declaration(class) else {
        return Vec::new();
    };
    relation_attributes(&declaration)
        .map(|(property, relation)| PropertyRef {
            class: class.to_string(),
            property: property.name.clone(),
            relation: relation.clone(),
            field_backed: property.field.is_some(),
            inverse: false,
        })
        .collect()
}

/// First relation on the target of `property` that points back at its class.
pub(crate) fn find_counterpart(
    ctx: &CompilationContext<'_>,
    property: &PropertyRef,
    accepts: impl Fn(&PropertyRef) -> bool,
) -> Option<PropertyRef> {
    declared_relations(ctx, &property.relation.target)
        .into_iter()
        .filter(|candidate| candidate.relation.target == property.class)
        .filter(|candidate| !(candidate.class == property.class && candidate.property == property.property))
        .find(|candidate| accepts(candidate))
}

pub trait RelationMetadataFactory: Send + Sync {
    fn supports(&self, property: &PropertyRef, ctx: &CompilationContext<'_>) -> bool;

    /// Resolve the relation: add linking fields or junction entities to the
    /// builders and register the connection.
    fn create_relation_metadata(
        &self,
        property: &PropertyRef,
        ctx: &mut CompilationContext<'_>,
    ) -> Result<(), MappingError>;
}

/// The ordered list of relation factories.
pub struct RelationFactoryChain {
    factories: Vec<Box<dyn RelationMetadataFactory>>,
}

impl Default for RelationFactoryChain {
    fn default() -> Self {
        Self::empty().with(OneToManyFactory).with(ManyToManyFactory)
    }
}

impl RelationFactoryChain {
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    pub fn with(mut self, factory: impl RelationMetadataFactory + 'static) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    /// Prepend a factory so it is consulted before the built-in ones.
    pub fn with_first(mut self, factory: impl RelationMetadataFactory + 'static) -> Self {
        self.factories.insert(0, Box::new(factory));
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Offer every relation property of the pass to the factories.
    pub fn process(&self, ctx: &mut CompilationContext<'_>) -> Result<(), MappingError> {
        let properties: Vec<PropertyRef> = ctx
            .classes()
            .iter()
            .flat_map(|class| declared_relations(ctx, class))
            .collect();
        for property in &properties {
            match self.factories.iter().find(|f| f.supports(property, ctx)) {
                Some(factory) => factory.create_relation_metadata(property, ctx)?,
                None => tracing::trace!(
                    class = %property.class,
                    property = %property.property,
                    "Relation already resolved"
                ),
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RelationFactoryChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationFactoryChain")
            .field("factories", &self.factories.len())
            .finish()
    }
}
