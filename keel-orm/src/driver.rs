use std::collections::BTreeMap;
use std::future::Future;

use crate::error::DataError;
use crate::query::{Dialect, QueryBuilder};
use crate::value::Value;

/// A fetched row: column name to stored value.
pub type Row = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    /// Declared column type as reported by the database.
    pub sql_type: String,
    pub nullable: bool,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescription {
    pub name: String,
    pub unique: bool,
    pub primary: bool,
    pub columns: Vec<String>,
}

/// The live shape of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<ColumnDescription>,
    pub indexes: Vec<IndexDescription>,
}

impl TableDescription {
    pub fn column(&self, name: &str) -> Option<&ColumnDescription> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&IndexDescription> {
        self.indexes.iter().find(|i| i.name == name)
    }
}

/// The database seen by the entity manager and the table factory.
///
/// Uses RPITIT (return-position `impl Trait` in traits), so no `async-trait` is needed.
pub trait Driver: Send + Sync {
    /// Dialect the driver renders builders with.
    fn dialect(&self) -> Dialect;

    /// Run raw SQL, typically DDL.
    fn native_query(&self, sql: &str) -> impl Future<Output = Result<ExecResult, DataError>> + Send;

    fn fetch_all(&self, query: &QueryBuilder) -> impl Future<Output = Result<Vec<Row>, DataError>> + Send;

    fn execute(&self, query: &QueryBuilder) -> impl Future<Output = Result<ExecResult, DataError>> + Send;

    /// Reflect a table; `None` when it does not exist.
    fn describe_table(
        &self,
        table: &str,
    ) -> impl Future<Output = Result<Option<TableDescription>, DataError>> + Send;
}
