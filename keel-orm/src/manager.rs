use std::sync::Arc;

use crate::config::OrmConfig;
use crate::driver::{Driver, Row};
use crate::entity::Entity;
use crate::error::DataError;
use crate::mapping::{EntityDefinition, Field};
use crate::query::{Arguments, QueryFactory, State};
use crate::registry::SchemaRegistry;
use crate::result::{ResultCollection, ResultEntity};
use crate::schema::{TableFactory, TableResult};
use crate::types::TypeRegistry;
use crate::value::Value;

/// Runs entity queries against a [`Driver`] and hydrates the rows.
///
/// Works on compiled metadata only: every class passed in must already be in
/// the registry.
pub struct EntityManager<D> {
    driver: D,
    registry: Arc<SchemaRegistry>,
    types: Arc<TypeRegistry>,
    queries: QueryFactory,
    config: OrmConfig,
}

/// The state value of `field`, looked up by property then column.
fn present<'s>(state: &'s State, field: &Field) -> Option<&'s Value> {
    state
        .value(&field.property)
        .or_else(|| state.value(&field.column))
}

fn state_value<'s>(state: &'s State, field: &Field) -> Option<&'s Value> {
    present(state, field).filter(|v| !v.is_null())
}

impl<D: Driver> EntityManager<D> {
    pub fn new(driver: D, registry: Arc<SchemaRegistry>, types: Arc<TypeRegistry>, config: OrmConfig) -> Self {
        let queries = QueryFactory::new(registry.clone(), types.clone(), driver.dialect());
        Self {
            driver,
            registry,
            types,
            queries,
            config,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn queries(&self) -> &QueryFactory {
        &self.queries
    }

    /// Insert or update, depending on whether the state carries a primary key.
    ///
    /// An auto-increment key in the state always means update, and updating a
    /// row that does not exist is [`DataError::NotFound`]. Other keys are
    /// looked up first. Returns the row as stored.
    pub async fn persist(&self, class: &str, state: &State) -> Result<ResultEntity, DataError> {
        let metadata = self.registry.entity(class)?;
        let entity = metadata.entity();
        let primary = entity.primary_field();
        let key = state_value(state, primary).cloned();

        let update = match &key {
            None => false,
            Some(_) if primary.auto_increment => true,
            Some(value) => self.exists(class, primary, value).await?,
        };

        let key = if update {
            let key = key.unwrap_or(Value::Null);
            let has_assignments = entity
                .fields
                .iter()
                .any(|f| !f.primary && present(state, f).is_some());
            let updated = if has_assignments {
                let result = self.driver.execute(&self.queries.update_query(class, state)?).await?;
                result.rows_affected > 0 || self.exists(class, primary, &key).await?
            } else {
                self.exists(class, primary, &key).await?
            };
            if !updated {
                return Err(DataError::NotFound(format!("{class} with {} = {key}", primary.property)));
            }
            tracing::debug!(class, key = %key, "Updated entity");
            key
        } else {
            let result = self.driver.execute(&self.queries.insert_query(class, state)?).await?;
            let key = match key {
                Some(key) => key,
                None => result.last_insert_id.map(Value::Int).ok_or_else(|| {
                    DataError::Other(format!("Driver returned no id for the new {class}"))
                })?,
            };
            tracing::debug!(class, key = %key, "Inserted entity");
            key
        };

        let lookup = State::new().with(primary.property.clone(), key);
        self.find_one(class, &lookup, Arguments::new(), true)
            .await?
            .ok_or_else(|| DataError::NotFound(class.to_string()))
    }

    async fn exists(&self, class: &str, primary: &Field, key: &Value) -> Result<bool, DataError> {
        let state = State::new().with(primary.property.clone(), key.clone());
        Ok(self.count(class, &state).await? > 0)
    }

    pub async fn find(&self, class: &str, state: &State, args: &Arguments) -> Result<ResultCollection, DataError> {
        let metadata = self.registry.entity(class)?;
        let entity = metadata.entity();
        let rows = self
            .driver
            .fetch_all(&self.queries.select_query(class, state, args)?)
            .await?;
        let items = rows
            .into_iter()
            .map(|row| self.hydrate(entity, row))
            .collect::<Result<Vec<_>, _>>()?;
        let total = self.count_matching(class, state, args).await?;
        Ok(ResultCollection::new(items, total, &entity.primary_field().property))
    }

    /// First match, or `None`. With `exception_on_not_found` a miss is
    /// [`DataError::NotFound`] instead.
    pub async fn find_one(
        &self,
        class: &str,
        state: &State,
        args: Arguments,
        exception_on_not_found: bool,
    ) -> Result<Option<ResultEntity>, DataError> {
        let metadata = self.registry.entity(class)?;
        let query = self.queries.select_query(class, state, &args.limit(1))?;
        let row = self.driver.fetch_all(&query).await?.into_iter().next();
        match row {
            Some(row) => self.hydrate(metadata.entity(), row).map(Some),
            None if exception_on_not_found => Err(DataError::NotFound(format!("No {class} matches the given filter"))),
            None => Ok(None),
        }
    }

    /// Delete matching rows and return how many went. An empty state matches
    /// every row.
    pub async fn delete(&self, class: &str, state: &State, args: &Arguments) -> Result<u64, DataError> {
        let result = self
            .driver
            .execute(&self.queries.delete_query(class, state, args)?)
            .await?;
        tracing::debug!(class, rows = result.rows_affected, "Deleted entities");
        Ok(result.rows_affected)
    }

    pub async fn count(&self, class: &str, state: &State) -> Result<u64, DataError> {
        self.count_matching(class, state, &Arguments::new()).await
    }

    /// Rows matching `state` and the `Where` arguments in `args`.
    pub async fn count_matching(&self, class: &str, state: &State, args: &Arguments) -> Result<u64, DataError> {
        let rows = self
            .driver
            .fetch_all(&self.queries.count_query(class, state, args)?)
            .await?;
        rows.first()
            .and_then(|row| row.get("total"))
            .and_then(Value::as_i64)
            .map(|total| total.max(0) as u64)
            .ok_or_else(|| DataError::Other(format!("Count query for {class} returned no total")))
    }

    /// Convert a stored row into application values keyed by property.
    /// Columns the entity does not map are ignored.
    pub fn hydrate(&self, entity: &EntityDefinition, mut row: Row) -> Result<ResultEntity, DataError> {
        let mut result = ResultEntity::new(entity.class.clone());
        for field in &entity.fields {
            let stored = row.remove(&field.column).unwrap_or(Value::Null);
            let value = self.types.to_app_value(field, stored)?;
            result.insert(field.property.clone(), value);
            if !field.serialize {
                result.hide(field.property.clone());
            }
        }
        Ok(result)
    }

    pub async fn save<T: Entity>(&self, entity: &T) -> Result<T, DataError> {
        let stored = self.persist(T::class_name(), &entity.to_state()).await?;
        T::from_result(&stored)
    }

    pub async fn find_by<T: Entity>(&self, state: &State, args: &Arguments) -> Result<Vec<T>, DataError> {
        self.find(T::class_name(), state, args).await?.into_typed()
    }

    pub async fn find_one_by<T: Entity>(&self, state: &State) -> Result<Option<T>, DataError> {
        match self.find_one(T::class_name(), state, Arguments::new(), false).await? {
            Some(result) => T::from_result(&result).map(Some),
            None => Ok(None),
        }
    }

    pub fn table_factory(&self) -> TableFactory<'_, D> {
        TableFactory::new(&self.driver, &self.types, &self.config)
    }

    /// Create or update the table of every compiled entity, junctions included.
    /// Columns and indexes missing from the metadata are dropped only when
    /// `orm.schema.prune` is set.
    pub async fn sync_schema(&self) -> Result<Vec<TableResult>, DataError> {
        let factory = self.table_factory();
        let mut results = Vec::new();
        for metadata in self.registry.get_all_class_metadata() {
            results.push(
                factory
                    .create_or_update_table(metadata.entity(), self.config.drop_non_existing)
                    .await?,
            );
        }
        Ok(results)
    }
}
