use keel_orm::driver::{ColumnDescription, Driver, ExecResult, IndexDescription, Row, TableDescription};
use keel_orm::query::{Dialect, Operation, QueryBuilder};
use keel_orm::{DataError, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};

use crate::config::DatabaseConfig;
use crate::error::SqlxErrorExt;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// [`Driver`] over an SQLite pool.
///
/// # Example
///
/// ```ignore
/// let driver = SqliteDriver::connect(&DatabaseConfig::from_config(&config)?).await?;
/// let em = orm.entity_manager(driver);
/// em.sync_schema().await?;
/// ```
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DataError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        tracing::info!(url = %config.url, "Connected to SQLite");
        Ok(Self::new(pool))
    }

    /// A private in-memory database. The pool holds a single connection, since
    /// every SQLite connection to `:memory:` opens a database of its own.
    pub async fn in_memory() -> Result<Self, DataError> {
        Self::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn text(value: &Value) -> String {
    match value.to_json() {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn bind<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.clone()),
        Value::Json(json) => query.bind(json.to_string()),
        other => query.bind(text(other)),
    }
}

fn decode(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let i = column.ordinal();
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => Value::Int(row.try_get::<i64, _>(i)?),
                "REAL" => Value::Float(row.try_get::<f64, _>(i)?),
                "BLOB" => Value::String(String::from_utf8_lossy(&row.try_get::<Vec<u8>, _>(i)?).into_owned()),
                _ => Value::String(row.try_get::<String, _>(i)?),
            }
        };
        decoded.insert(column.name().to_string(), value);
    }
    Ok(decoded)
}

impl SqliteDriver {
    async fn pragma(&self, sql: &str) -> Result<Vec<SqliteRow>, DataError> {
        sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    async fn index_columns(&self, index: &str) -> Result<Vec<String>, DataError> {
        let rows = self.pragma(&format!("PRAGMA index_info({})", quote(index))).await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let seqno: i64 = row.try_get("seqno").map_err(SqlxErrorExt::into_data_error)?;
            let name: Option<String> = row.try_get("name").map_err(SqlxErrorExt::into_data_error)?;
            columns.push((seqno, name.unwrap_or_default()));
        }
        columns.sort_by_key(|(seqno, _)| *seqno);
        Ok(columns.into_iter().map(|(_, name)| name).collect())
    }
}

impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn native_query(&self, sql: &str) -> Result<ExecResult, DataError> {
        tracing::debug!(sql, "Executing native query");
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
        })
    }

    async fn fetch_all(&self, query: &QueryBuilder) -> Result<Vec<Row>, DataError> {
        let statement = query.build()?;
        tracing::debug!(sql = %statement.sql, params = statement.params.len(), "Fetching rows");
        let rows = statement
            .params
            .iter()
            .fold(sqlx::query(&statement.sql), bind)
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        rows.iter()
            .map(|row| decode(row).map_err(SqlxErrorExt::into_data_error))
            .collect()
    }

    async fn execute(&self, query: &QueryBuilder) -> Result<ExecResult, DataError> {
        let statement = query.build()?;
        tracing::debug!(sql = %statement.sql, params = statement.params.len(), "Executing statement");
        let result = statement
            .params
            .iter()
            .fold(sqlx::query(&statement.sql), bind)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        let last_insert_id = match query.get_operation() {
            Operation::Insert => Some(result.last_insert_rowid()),
            _ => None,
        };
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id,
        })
    }

    /// Reflects columns through `PRAGMA table_info` and indexes through
    /// `PRAGMA index_list`. The primary key is reported as an index named
    /// `PRIMARY`; SQLite's own primary key autoindexes are skipped.
    async fn describe_table(&self, table: &str) -> Result<Option<TableDescription>, DataError> {
        let rows = self.pragma(&format!("PRAGMA table_info({})", quote(table))).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut columns = Vec::with_capacity(rows.len());
        let mut primary = Vec::new();
        for row in &rows {
            let name: String = row.try_get("name").map_err(SqlxErrorExt::into_data_error)?;
            let sql_type: String = row.try_get("type").map_err(SqlxErrorExt::into_data_error)?;
            let not_null: i64 = row.try_get("notnull").map_err(SqlxErrorExt::into_data_error)?;
            let pk: i64 = row.try_get("pk").map_err(SqlxErrorExt::into_data_error)?;
            if pk > 0 {
                primary.push((pk, name.clone()));
            }
            columns.push(ColumnDescription {
                name,
                sql_type,
                nullable: not_null == 0,
                primary: pk > 0,
            });
        }

        let mut indexes = Vec::new();
        if !primary.is_empty() {
            primary.sort_by_key(|(position, _)| *position);
            indexes.push(IndexDescription {
                name: "PRIMARY".to_string(),
                unique: true,
                primary: true,
                columns: primary.into_iter().map(|(_, name)| name).collect(),
            });
        }
        for row in self.pragma(&format!("PRAGMA index_list({})", quote(table))).await? {
            let origin: String = row.try_get("origin").map_err(SqlxErrorExt::into_data_error)?;
            if origin == "pk" {
                continue;
            }
            let name: String = row.try_get("name").map_err(SqlxErrorExt::into_data_error)?;
            let unique: i64 = row.try_get("unique").map_err(SqlxErrorExt::into_data_error)?;
            let columns = self.index_columns(&name).await?;
            indexes.push(IndexDescription {
                name,
                unique: unique != 0,
                primary: false,
                columns,
            });
        }

        Ok(Some(TableDescription {
            name: table.to_string(),
            columns,
            indexes,
        }))
    }
}
