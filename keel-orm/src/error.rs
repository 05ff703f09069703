use keel_cache::CacheError;

use crate::query::QueryError;
use crate::types::TypeError;

/// Errors in entity declarations or their compilation into metadata.
///
/// These are configuration errors: they surface at startup, never per request.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingError {
    /// A discovered class has no declaration in the catalog.
    ClassNotFound(String),
    /// A declaration lacks the entity attribute.
    NotAnEntity(String),
    MissingPrimaryKey(String),
    MultiplePrimaryKeys { class: String, fields: Vec<String> },
    DuplicateColumn { class: String, column: String },
    /// A class-level index names a property that is not a mapped field.
    UnknownIndexField { class: String, field: String },
    /// A relation points at a class that is not part of the compiled set.
    EntityNotRegistered(String),
    /// A relation names a linking column the entity does not have.
    UnknownLinkingField { class: String, column: String },
    DuplicateType(String),
}

impl std::fmt::Display for MappingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingError::ClassNotFound(class) => write!(f, "Class not found: {class}"),
            MappingError::NotAnEntity(class) => {
                write!(f, "Class {class} is not declared as an entity")
            }
            MappingError::MissingPrimaryKey(class) => {
                write!(f, "Entity {class} has no primary key")
            }
            MappingError::MultiplePrimaryKeys { class, fields } => write!(
                f,
                "Entity {class} declares more than one primary key: {}",
                fields.join(", ")
            ),
            MappingError::DuplicateColumn { class, column } => {
                write!(f, "Entity {class} maps column '{column}' twice")
            }
            MappingError::UnknownIndexField { class, field } => {
                write!(f, "Index on {class} references unknown field '{field}'")
            }
            MappingError::EntityNotRegistered(class) => {
                write!(f, "Entity {class} is not registered")
            }
            MappingError::UnknownLinkingField { class, column } => {
                write!(f, "Entity {class} has no linking column '{column}'")
            }
            MappingError::DuplicateType(name) => {
                write!(f, "Type '{name}' is registered more than once")
            }
        }
    }
}

impl std::error::Error for MappingError {}

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    NotFound(String),
    /// A unique constraint rejected the write.
    DuplicateEntry(String),
    Database(Box<dyn std::error::Error + Send + Sync>),
    Mapping(MappingError),
    Query(QueryError),
    Type(TypeError),
    Cache(CacheError),
    Other(String),
}

impl DataError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by driver crates (e.g. `keel-orm-sqlx`) to wrap backend errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound(_))
    }

    pub fn is_duplicate_entry(&self) -> bool {
        matches!(self, DataError::DuplicateEntry(_))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::DuplicateEntry(msg) => write!(f, "Duplicate entry: {msg}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
            DataError::Mapping(err) => write!(f, "Mapping error: {err}"),
            DataError::Query(err) => write!(f, "Query error: {err}"),
            DataError::Type(err) => write!(f, "Type error: {err}"),
            DataError::Cache(err) => write!(f, "Metadata cache error: {err}"),
            DataError::Other(msg) => write!(f, "Data error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err.as_ref()),
            DataError::Mapping(err) => Some(err),
            DataError::Query(err) => Some(err),
            DataError::Type(err) => Some(err),
            DataError::Cache(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MappingError> for DataError {
    fn from(err: MappingError) -> Self {
        DataError::Mapping(err)
    }
}

impl From<QueryError> for DataError {
    fn from(err: QueryError) -> Self {
        DataError::Query(err)
    }
}

impl From<TypeError> for DataError {
    fn from(err: TypeError) -> Self {
        DataError::Type(err)
    }
}

impl From<CacheError> for DataError {
    fn from(err: CacheError) -> Self {
        DataError::Cache(err)
    }
}
