use std::sync::Arc;

use super::argument::resolve_field;
use super::{Arguments, Dialect, IdentifierPolicy, QueryBuilder, QueryError, State, StateValue};
use crate::error::DataError;
use crate::mapping::{ClassMetadata, EntityDefinition, Field};
use crate::registry::SchemaRegistry;
use crate::types::TypeRegistry;
use crate::value::Value;

/// Builds entity-aware statements from states and arguments.
///
/// State keys may name a property or a column. Values are converted to their
/// stored form through each field's type before they reach the builder.
#[derive(Debug, Clone)]
pub struct QueryFactory {
    registry: Arc<SchemaRegistry>,
    types: Arc<TypeRegistry>,
    dialect: Dialect,
}

impl QueryFactory {
    pub fn new(registry: Arc<SchemaRegistry>, types: Arc<TypeRegistry>, dialect: Dialect) -> Self {
        Self {
            registry,
            types,
            dialect,
        }
    }

    fn entity(&self, class: &str) -> Result<Arc<ClassMetadata>, DataError> {
        Ok(self.registry.entity(class)?)
    }

    fn base(&self, query: QueryBuilder) -> QueryBuilder {
        query
            .dialect(self.dialect)
            .identifier_policy(IdentifierPolicy::Quote)
    }

    fn stored(&self, field: &Field, value: &Value) -> Result<Value, DataError> {
        self.types
            .to_database_value(field, value.clone())
            .map_err(DataError::from)
    }

    /// Equality predicates for every state key; list values become OR groups.
    fn apply_filter(
        &self,
        mut query: QueryBuilder,
        entity: &EntityDefinition,
        state: &State,
    ) -> Result<QueryBuilder, DataError> {
        for (key, value) in state.iter() {
            let field = resolve_field(entity, key)?;
            query = match value {
                StateValue::Scalar(Value::Null) => query.where_null(&field.column),
                StateValue::Scalar(v) => query.where_eq(&field.column, self.stored(field, v)?),
                StateValue::List(values) => {
                    let stored = values
                        .iter()
                        .map(|v| self.stored(field, v))
                        .collect::<Result<Vec<_>, _>>()?;
                    query.where_any(&field.column, stored)
                }
            };
        }
        Ok(query)
    }

    /// The scalar state value of `field`, looked up by property then column.
    fn state_value<'s>(state: &'s State, field: &Field) -> Option<&'s Value> {
        state
            .value(&field.property)
            .or_else(|| state.value(&field.column))
    }

    pub fn select_query(&self, class: &str, state: &State, args: &Arguments) -> Result<QueryBuilder, DataError> {
        let metadata = self.entity(class)?;
        let entity = metadata.entity();
        let query = self.base(QueryBuilder::new(&entity.table))
            .columns(entity.fields.iter().map(|f| f.column.clone()));
        let query = self.apply_filter(query, entity, state)?;
        args.apply(query, entity, &self.types)
    }

    /// COUNT over the same filter. Only `Where` arguments apply; paging,
    /// ordering and grouping are skipped.
    pub fn count_query(&self, class: &str, state: &State, args: &Arguments) -> Result<QueryBuilder, DataError> {
        let metadata = self.entity(class)?;
        let entity = metadata.entity();
        let query = self.apply_filter(self.base(QueryBuilder::count(&entity.table)), entity, state)?;
        args.apply_filters(query, entity, &self.types)
    }

    /// INSERT of every known field present in `state`. Unknown keys are ignored
    /// and a null auto-increment key is left to the database.
    pub fn insert_query(&self, class: &str, state: &State) -> Result<QueryBuilder, DataError> {
        let metadata = self.entity(class)?;
        let entity = metadata.entity();
        let mut query = self.base(QueryBuilder::insert(&entity.table));
        for field in &entity.fields {
            let Some(value) = Self::state_value(state, field) else {
                continue;
            };
            if field.auto_increment && value.is_null() {
                continue;
            }
            query = query.set(&field.column, self.stored(field, value)?);
        }
        Ok(query)
    }

    /// UPDATE of every known non-key field in `state`, matched on the primary key.
    pub fn update_query(&self, class: &str, state: &State) -> Result<QueryBuilder, DataError> {
        let metadata = self.entity(class)?;
        let entity = metadata.entity();
        let primary = entity.primary_field();
        let key = Self::state_value(state, primary)
            .filter(|v| !v.is_null())
            .ok_or_else(|| QueryError::MissingPrimaryKey {
                entity: entity.class.clone(),
            })?;

        let mut query = self.base(QueryBuilder::update(&entity.table));
        for field in entity.fields.iter().filter(|f| !f.primary) {
            if let Some(value) = Self::state_value(state, field) {
                query = query.set(&field.column, self.stored(field, value)?);
            }
        }
        Ok(query.where_eq(&primary.column, self.stored(primary, key)?))
    }

    /// DELETE of every matching row. Arguments other than filters cannot be
    /// rendered in a DELETE and are rejected.
    pub fn delete_query(&self, class: &str, state: &State, args: &Arguments) -> Result<QueryBuilder, DataError> {
        if let Some(modifier) = args.first_modifier() {
            return Err(QueryError::Unsupported {
                dialect: self.dialect.name(),
                what: format!("{modifier:?} in a DELETE"),
            }
            .into());
        }
        let metadata = self.entity(class)?;
        let entity = metadata.entity();
        let query = self.apply_filter(self.base(QueryBuilder::delete(&entity.table)), entity, state)?;
        args.apply(query, entity, &self.types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{EntityBuilder, FieldSource};
    use crate::query::{Comparison, Direction};

    fn factory() -> QueryFactory {
        let registry = SchemaRegistry::in_memory();
        let mut builder = EntityBuilder::new("User", "user", "app_user");
        builder.add_field(Field::auto_id("id", FieldSource::Declared)).unwrap();
        builder.add_field(Field::new("status", "string")).unwrap();
        let mut created = Field::new("createdAt", "datetime");
        created.column = "created_at".into();
        created.nullable = true;
        builder.add_field(created).unwrap();
        builder.add_field(Field::new("score", "double")).unwrap();
        registry
            .set_class_metadata(ClassMetadata::new(builder.build().unwrap(), None))
            .unwrap();
        QueryFactory::new(
            Arc::new(registry),
            Arc::new(TypeRegistry::with_defaults()),
            Dialect::MySql,
        )
    }

    #[test]
    fn list_filters_render_as_or_groups() {
        let state = State::new()
            .with_any("status", ["active", "pending"])
            .with("id", 7_i64);
        let stmt = factory()
            .select_query("User", &state, &Arguments::new())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT `id`, `status`, `created_at`, `score` FROM `app_user` WHERE `id` = ? AND (`status` = ? OR `status` = ?)"
        );
        assert_eq!(
            stmt.params,
            vec![Value::Int(7), Value::from("active"), Value::from("pending")]
        );
    }

    #[test]
    fn select_applies_arguments_after_filters() {
        let args = Arguments::new()
            .filter("score", Comparison::Gt, 1.5)
            .order_by("createdAt", Direction::Desc)
            .limit(10);
        let stmt = factory()
            .select_query("User", &State::new(), &args)
            .unwrap()
            .build()
            .unwrap();
        assert!(stmt
            .sql
            .ends_with("WHERE `score` > ? ORDER BY `created_at` DESC LIMIT 10"));
        assert_eq!(stmt.params, vec![Value::from("1.5")]);
    }

    #[test]
    fn unknown_filter_key_is_rejected() {
        let err = factory()
            .select_query("User", &State::new().with("nope", 1_i64), &Arguments::new())
            .unwrap_err();
        assert!(matches!(err, DataError::Query(QueryError::UnknownField { .. })));
    }

    #[test]
    fn insert_skips_null_auto_increment_key_and_unknown_keys() {
        let state = State::new()
            .with("id", Value::Null)
            .with("status", "active")
            .with("created_at", "2024-01-02T03:04:05Z")
            .with("extra", "ignored");
        let stmt = factory().insert_query("User", &state).unwrap().build().unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO `app_user` (`status`, `created_at`) VALUES (?, ?)"
        );
        assert_eq!(stmt.params[1], Value::from("2024-01-02 03:04:05"));
    }

    #[test]
    fn update_requires_and_targets_primary_key() {
        let factory = factory();
        let err = factory
            .update_query("User", &State::new().with("status", "banned"))
            .unwrap_err();
        assert!(matches!(err, DataError::Query(QueryError::MissingPrimaryKey { .. })));

        let stmt = factory
            .update_query("User", &State::new().with("id", 3_i64).with("status", "banned"))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "UPDATE `app_user` SET `status` = ? WHERE `id` = ?");
        assert_eq!(stmt.params, vec![Value::from("banned"), Value::Int(3)]);
    }

    #[test]
    fn count_and_delete_share_the_filter() {
        let factory = factory();
        let state = State::new().with("createdAt", Value::Null);
        let count = factory.count_query("User", &state, &Arguments::new()).unwrap().build().unwrap();
        assert_eq!(
            count.sql,
            "SELECT COUNT(*) AS total FROM `app_user` WHERE `created_at` IS NULL"
        );
        let delete = factory
            .delete_query("User", &state, &Arguments::new())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(delete.sql, "DELETE FROM `app_user` WHERE `created_at` IS NULL");
    }

    #[test]
    fn scalar_filters_are_joined_with_and() {
        let state = State::new().with("status", "active").with("score", 2.5);
        let stmt = factory()
            .select_query("User", &state, &Arguments::new())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT `id`, `status`, `created_at`, `score` FROM `app_user` WHERE `score` = ? AND `status` = ?"
        );
        assert_eq!(stmt.params, vec![Value::from("2.5"), Value::from("active")]);
    }

    #[test]
    fn count_keeps_where_arguments_and_drops_paging() {
        let args = Arguments::new()
            .filter("status", Comparison::NotEq, "banned")
            .order_by("createdAt", Direction::Desc)
            .offset(20)
            .limit(10);
        let stmt = factory()
            .count_query("User", &State::new(), &args)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS total FROM `app_user` WHERE `status` != ?"
        );
        assert_eq!(stmt.params, vec![Value::from("banned")]);
    }

    #[test]
    fn delete_rejects_paging_and_ordering() {
        let factory = factory();
        for args in [
            Arguments::new().limit(1),
            Arguments::new().offset(3),
            Arguments::new().order_by("score", Direction::Asc),
            Arguments::new().filter("status", Comparison::Eq, "x").group_by("status"),
        ] {
            let err = factory.delete_query("User", &State::new(), &args).unwrap_err();
            assert!(
                matches!(err, DataError::Query(QueryError::Unsupported { dialect: "mysql", .. })),
                "{err}"
            );
        }

        let stmt = factory
            .delete_query(
                "User",
                &State::new(),
                &Arguments::new().filter("score", Comparison::Lt, 1.0),
            )
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "DELETE FROM `app_user` WHERE `score` < ?");
    }

    #[test]
    fn unregistered_class_fails() {
        assert!(matches!(
            factory().count_query("Ghost", &State::new(), &Arguments::new()),
            Err(DataError::Mapping(_))
        ));
    }
}
