use std::fmt;

use super::{Condition, QueryBuilder, QueryError};
use crate::error::DataError;
use crate::mapping::{EntityDefinition, Field};
use crate::types::TypeRegistry;
use crate::value::Value;

/// A modifier applied to a query against an entity.
///
/// Field names are validated against the entity, so a typo fails before any
/// SQL is rendered.
pub trait Argument: fmt::Debug + Send + Sync {
    fn apply(
        &self,
        query: QueryBuilder,
        entity: &EntityDefinition,
        types: &TypeRegistry,
    ) -> Result<QueryBuilder, DataError>;

    /// Whether the argument only narrows the matched rows. Counts and
    /// deletes take filters and nothing else.
    fn is_filter(&self) -> bool {
        false
    }
}

/// Resolve a property or column name, listing the valid names on failure.
pub(crate) fn resolve_field<'a>(
    entity: &'a EntityDefinition,
    name: &str,
) -> Result<&'a Field, QueryError> {
    entity.field(name).ok_or_else(|| QueryError::UnknownField {
        entity: entity.class.clone(),
        field: name.to_string(),
        valid: entity.property_names(),
    })
}

#[derive(Debug, Clone, Copy)]
pub struct Offset(pub u64);

impl Argument for Offset {
    fn apply(&self, query: QueryBuilder, _: &EntityDefinition, _: &TypeRegistry) -> Result<QueryBuilder, DataError> {
        Ok(query.offset(self.0))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Limit(pub u64);

impl Argument for Limit {
    fn apply(&self, query: QueryBuilder, _: &EntityDefinition, _: &TypeRegistry) -> Result<QueryBuilder, DataError> {
        Ok(query.limit(self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(format!("unknown sort direction '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl Argument for OrderBy {
    fn apply(&self, query: QueryBuilder, entity: &EntityDefinition, _: &TypeRegistry) -> Result<QueryBuilder, DataError> {
        let field = resolve_field(entity, &self.field)?;
        Ok(query.order_by(&field.column, self.direction == Direction::Asc))
    }
}

#[derive(Debug, Clone)]
pub struct GroupBy(pub String);

impl Argument for GroupBy {
    fn apply(&self, query: QueryBuilder, entity: &EntityDefinition, _: &TypeRegistry) -> Result<QueryBuilder, DataError> {
        let field = resolve_field(entity, &self.0)?;
        Ok(query.group_by(&field.column))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    IsNull,
    IsNotNull,
}

/// A single predicate; the value goes through the field's type transformer.
#[derive(Debug, Clone)]
pub struct Where {
    pub field: String,
    pub comparison: Comparison,
    pub value: Value,
}

impl Argument for Where {
    fn apply(&self, query: QueryBuilder, entity: &EntityDefinition, types: &TypeRegistry) -> Result<QueryBuilder, DataError> {
        let field = resolve_field(entity, &self.field)?;
        let column = field.column.clone();
        let stored = || {
            types
                .to_database_value(field, self.value.clone())
                .map_err(DataError::from)
        };
        let condition = match self.comparison {
            Comparison::IsNull => Condition::IsNull(column),
            Comparison::IsNotNull => Condition::IsNotNull(column),
            Comparison::Like => Condition::Like(column, self.value.clone()),
            Comparison::Eq if self.value.is_null() => Condition::IsNull(column),
            Comparison::Eq => Condition::Eq(column, stored()?),
            Comparison::NotEq => Condition::NotEq(column, stored()?),
            Comparison::Gt => Condition::Gt(column, stored()?),
            Comparison::Gte => Condition::Gte(column, stored()?),
            Comparison::Lt => Condition::Lt(column, stored()?),
            Comparison::Lte => Condition::Lte(column, stored()?),
        };
        Ok(query.condition(condition))
    }

    fn is_filter(&self) -> bool {
        true
    }
}

/// An ordered list of query arguments.
///
/// ```ignore
/// let args = Arguments::new()
///     .filter("age", Comparison::Gte, 18)
///     .order_by("name", Direction::Asc)
///     .limit(20);
/// ```
#[derive(Debug, Default)]
pub struct Arguments(Vec<Box<dyn Argument>>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, argument: impl Argument + 'static) -> Self {
        self.0.push(Box::new(argument));
        self
    }

    pub fn offset(self, offset: u64) -> Self {
        self.with(Offset(offset))
    }

    pub fn limit(self, limit: u64) -> Self {
        self.with(Limit(limit))
    }

    pub fn order_by(self, field: impl Into<String>, direction: Direction) -> Self {
        self.with(OrderBy {
            field: field.into(),
            direction,
        })
    }

    pub fn group_by(self, field: impl Into<String>) -> Self {
        self.with(GroupBy(field.into()))
    }

    pub fn filter(self, field: impl Into<String>, comparison: Comparison, value: impl Into<Value>) -> Self {
        self.with(Where {
            field: field.into(),
            comparison,
            value: value.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply every argument in order.
    pub fn apply(
        &self,
        query: QueryBuilder,
        entity: &EntityDefinition,
        types: &TypeRegistry,
    ) -> Result<QueryBuilder, DataError> {
        self.0
            .iter()
            .try_fold(query, |query, argument| argument.apply(query, entity, types))
    }

    /// Apply the filters only, skipping paging, ordering and grouping.
    pub fn apply_filters(
        &self,
        query: QueryBuilder,
        entity: &EntityDefinition,
        types: &TypeRegistry,
    ) -> Result<QueryBuilder, DataError> {
        self.0
            .iter()
            .filter(|argument| argument.is_filter())
            .try_fold(query, |query, argument| argument.apply(query, entity, types))
    }

    /// The first argument that is not a filter.
    pub fn first_modifier(&self) -> Option<&dyn Argument> {
        self.0
            .iter()
            .find(|argument| !argument.is_filter())
            .map(|argument| argument.as_ref())
    }
}
