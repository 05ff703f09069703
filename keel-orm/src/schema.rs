//! Table synchronization: diff entity metadata against the live database and
//! emit the CREATE or ALTER that reconciles them.

use crate::config::OrmConfig;
use crate::driver::{Driver, TableDescription};
use crate::error::DataError;
use crate::mapping::{EntityDefinition, IndexType};
use crate::query::{
    ColumnDefinition, Dialect, IndexDefinition, QueryError, TableAction, TableQuery,
};
use crate::types::TypeRegistry;

/// Outcome of [`TableFactory::create_or_update_table`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableResult {
    pub table: String,
    pub created: bool,
    pub altered: bool,
    /// Statements that were executed, in order.
    pub statements: Vec<String>,
    /// Live columns the metadata no longer declares.
    pub non_existing_columns: Vec<String>,
    /// Live indexes the metadata no longer declares.
    pub non_existing_indexes: Vec<String>,
}

/// The table statement to run plus what exists only in the database.
#[derive(Debug, Clone)]
pub struct TablePlan {
    pub query: TableQuery,
    pub non_existing_columns: Vec<String>,
    pub non_existing_indexes: Vec<String>,
}

fn same_type(declared: &str, live: &str) -> bool {
    declared.trim().eq_ignore_ascii_case(live.trim())
}

/// Compare an entity against the live table, if any.
///
/// Columns and indexes found only in the database are reported; they are
/// dropped only when `drop_non_existing` is set.
pub fn plan(
    entity: &EntityDefinition,
    live: Option<&TableDescription>,
    types: &TypeRegistry,
    config: &OrmConfig,
    dialect: Dialect,
    drop_non_existing: bool,
) -> Result<TablePlan, QueryError> {
    let Some(live) = live else {
        let mut query = TableQuery::create(&entity.table)
            .engine(config.engine.clone())
            .comment(entity.comment.clone());
        for field in &entity.fields {
            query.add_field(TableAction::Add, ColumnDefinition::from_field(field, types))?;
        }
        for index in &entity.indexes {
            query.add_index(TableAction::Add, IndexDefinition::from(index))?;
        }
        return Ok(TablePlan {
            query,
            non_existing_columns: Vec::new(),
            non_existing_indexes: Vec::new(),
        });
    };

    let mut query = TableQuery::alter(&entity.table);
    for field in &entity.fields {
        let column = ColumnDefinition::from_field(field, types);
        match live.column(&field.column) {
            None => {
                query.add_field(TableAction::Add, column)?;
            }
            Some(current) => {
                let retyped = !same_type(column.sql_type(dialect), &current.sql_type);
                let renulled = !field.primary && current.nullable != column.nullable;
                if retyped || renulled {
                    query.add_field(TableAction::Modify, column)?;
                }
            }
        }
    }

    let mut non_existing_columns = Vec::new();
    for current in &live.columns {
        if entity.field_by_column(&current.name).is_none() {
            non_existing_columns.push(current.name.clone());
            if drop_non_existing {
                query.add_field(TableAction::Drop, ColumnDefinition::named(&current.name))?;
            }
        }
    }

    for index in &entity.indexes {
        let wanted = IndexDefinition::from(index);
        match live.index(&index.name) {
            None => {
                query.add_index(TableAction::Add, wanted)?;
            }
            Some(current) => {
                let kind_matches = match index.kind {
                    IndexType::Primary => current.primary,
                    IndexType::Unique => current.unique && !current.primary,
                    IndexType::Index => !current.unique && !current.primary,
                };
                if !kind_matches || current.columns != index.columns {
                    query.add_index(TableAction::Modify, wanted)?;
                }
            }
        }
    }

    let mut non_existing_indexes = Vec::new();
    for current in &live.indexes {
        if entity.index(&current.name).is_none() {
            non_existing_indexes.push(current.name.clone());
            if drop_non_existing {
                let kind = if current.primary {
                    IndexType::Primary
                } else if current.unique {
                    IndexType::Unique
                } else {
                    IndexType::Index
                };
                query.add_index(TableAction::Drop, IndexDefinition::named(&current.name, kind))?;
            }
        }
    }

    Ok(TablePlan {
        query,
        non_existing_columns,
        non_existing_indexes,
    })
}

/// Creates, alters and drops the tables of compiled entities.
pub struct TableFactory<'a, D> {
    driver: &'a D,
    types: &'a TypeRegistry,
    config: &'a OrmConfig,
}

impl<'a, D: Driver> TableFactory<'a, D> {
    pub fn new(driver: &'a D, types: &'a TypeRegistry, config: &'a OrmConfig) -> Self {
        Self {
            driver,
            types,
            config,
        }
    }

    pub async fn create_or_update_table(
        &self,
        entity: &EntityDefinition,
        drop_non_existing: bool,
    ) -> Result<TableResult, DataError> {
        let live = self.driver.describe_table(&entity.table).await?;
        let plan = plan(
            entity,
            live.as_ref(),
            self.types,
            self.config,
            self.driver.dialect(),
            drop_non_existing,
        )?;
        let statements = plan.query.statements(self.driver.dialect())?;
        for sql in &statements {
            tracing::debug!(table = %entity.table, sql = %sql, "Executing table statement");
            self.driver.native_query(sql).await?;
        }

        let created = live.is_none();
        let altered = !created && !statements.is_empty();
        if created {
            tracing::info!(table = %entity.table, class = %entity.class, "Created table");
        } else if altered {
            tracing::info!(table = %entity.table, statements = statements.len(), "Altered table");
        }
        if !drop_non_existing
            && (!plan.non_existing_columns.is_empty() || !plan.non_existing_indexes.is_empty())
        {
            tracing::warn!(
                table = %entity.table,
                columns = ?plan.non_existing_columns,
                indexes = ?plan.non_existing_indexes,
                "Table has columns or indexes the metadata does not declare"
            );
        }

        Ok(TableResult {
            table: entity.table.clone(),
            created,
            altered,
            statements,
            non_existing_columns: plan.non_existing_columns,
            non_existing_indexes: plan.non_existing_indexes,
        })
    }

    pub async fn drop_table(&self, entity: &EntityDefinition) -> Result<(), DataError> {
        for sql in TableQuery::delete(&entity.table).statements(self.driver.dialect())? {
            self.driver.native_query(&sql).await?;
        }
        tracing::info!(table = %entity.table, "Dropped table");
        Ok(())
    }
}
