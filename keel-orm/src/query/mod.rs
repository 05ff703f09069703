//! SQL construction: the fluent builder, query arguments, entity-aware query
//! factory and table DDL.

mod argument;
mod builder;
mod factory;
mod state;
mod table;

pub use argument::{Argument, Arguments, Comparison, Direction, GroupBy, Limit, Offset, OrderBy, Where};
pub use builder::{Condition, Dialect, IdentifierPolicy, Operation, QueryBuilder, Statement};
pub use factory::QueryFactory;
pub use state::{State, StateValue};
pub use table::{ColumnDefinition, IndexDefinition, TableAction, TableQuery, TableQueryType};

#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    /// A filter, sort or grouping names something the entity does not map.
    UnknownField {
        entity: String,
        field: String,
        valid: Vec<String>,
    },
    MissingPrimaryKey { entity: String },
    /// An UPDATE with nothing to set.
    EmptyAssignments { table: String },
    /// A column or index action the table statement cannot carry, such as
    /// MODIFY inside a CREATE.
    InvalidTableAction {
        table: String,
        action: &'static str,
        statement: &'static str,
    },
    Unsupported { dialect: &'static str, what: String },
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            QueryError::UnknownField {
                entity,
                field,
                valid,
            } => write!(
                f,
                "Unknown field '{field}' on {entity}; valid fields: {}",
                valid.join(", ")
            ),
            QueryError::MissingPrimaryKey { entity } => {
                write!(f, "Primary key value required for {entity}")
            }
            QueryError::EmptyAssignments { table } => {
                write!(f, "Nothing to update in {table}")
            }
            QueryError::InvalidTableAction {
                table,
                action,
                statement,
            } => write!(f, "Cannot {action} columns or indexes in a {statement} of table {table}"),
            QueryError::Unsupported { dialect, what } => {
                write!(f, "{what} is not supported by the {dialect} dialect")
            }
        }
    }
}

impl std::error::Error for QueryError {}
