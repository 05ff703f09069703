//! # keel-orm: entity mapping and relation resolution for Keel
//!
//! Entities are declared with `#[derive(Entity)]` (or an
//! [`EntityDeclaration`] built by hand), compiled once into cached
//! [`ClassMetadata`], and then used to render SQL and hydrate rows.
//!
//! | Stage | Types |
//! |-------|-------|
//! | Declarations | [`EntityDeclaration`], [`EntityCatalog`] |
//! | Compilation | [`MetadataCompiler`], [`RelationFactoryChain`], [`ClassMetadataFactory`] |
//! | Storage | [`SchemaRegistry`] over a `keel-cache` pool |
//! | SQL | [`QueryFactory`], [`QueryBuilder`], [`TableQuery`], [`TableFactory`] |
//! | Runtime | [`EntityManager`], [`ResultEntity`], [`EntityRepository`] |

extern crate self as keel_orm;

pub mod catalog;
pub mod config;
pub mod declaration;
pub mod driver;
pub mod entity;
pub mod error;
pub mod manager;
pub mod mapping;
pub mod metadata;
pub mod orm;
pub mod page;
pub mod query;
pub mod registry;
pub mod repository;
pub mod result;
pub mod schema;
pub mod types;
pub mod value;

pub use catalog::EntityCatalog;
pub use config::OrmConfig;
pub use declaration::{
    EntityAttribute, EntityDeclaration, FieldAttribute, IndexAttribute, InverseRelationSpec,
    PropertyDeclaration, RelationAttribute,
};
pub use driver::{ColumnDescription, Driver, ExecResult, IndexDescription, Row, TableDescription};
pub use entity::Entity;
pub use error::{DataError, MappingError};
pub use manager::EntityManager;
pub use mapping::{ClassMetadata, EntityDefinition, Field, Index, IndexType, Relation, RelationKind};
pub use metadata::{ClassMetadataFactory, CompileReport, MetadataCompiler, RelationFactoryChain};
pub use orm::{Orm, OrmBuilder};
pub use page::{Page, Pageable};
pub use query::{Arguments, Comparison, Dialect, Direction, QueryBuilder, QueryError, QueryFactory, State, TableQuery};
pub use registry::SchemaRegistry;
pub use repository::{EntityRepository, Repository};
pub use result::{ResultCollection, ResultEntity};
pub use schema::{TableFactory, TableResult};
pub use types::{TypeError, TypeInterface, TypeRegistry};
pub use value::{FromValue, Value};

/// `#[derive(Entity)]`.
pub use keel_macros::Entity;

pub mod prelude {
    //! Re-exports of the most commonly used ORM types.
    pub use crate::{
        Arguments, Comparison, DataError, Direction, Entity, EntityManager, EntityRepository, FieldAttribute,
        Orm, Page, Pageable, RelationAttribute, RelationKind, Repository, ResultEntity, State, Value,
    };
}
