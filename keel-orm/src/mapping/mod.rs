//! Physical schema model: entities, fields, indexes, relations and connections.

mod class_metadata;
mod connection;
mod definition;
mod field;
mod index;
mod naming;
mod relation;

pub use class_metadata::ClassMetadata;
pub use connection::{connection_key, ConnectionSide, EntitiesConnection};
pub use definition::{EntityBuilder, EntityDefinition};
pub use field::{Field, FieldSource};
pub use index::{Index, IndexType};
pub use naming::{DefaultNamingStrategy, NamingStrategy};
pub use relation::{JunctionLink, Relation, RelationKind};
