use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use keel_orm::declaration::{EntityDeclaration, FieldAttribute};
use keel_orm::driver::{ColumnDescription, Driver, ExecResult, IndexDescription, Row, TableDescription};
use keel_orm::mapping::IndexType;
use keel_orm::query::{Arguments, Comparison, Dialect, QueryBuilder, QueryError, State};
use keel_orm::{DataError, EntityManager, Orm, OrmConfig, Value};

enum Reply {
    Rows(Vec<Row>),
    Exec(ExecResult),
}

/// Replays scripted replies and records every statement it is given.
#[derive(Default)]
struct ScriptedDriver {
    replies: Mutex<VecDeque<Reply>>,
    tables: Mutex<HashMap<String, TableDescription>>,
    statements: Mutex<Vec<String>>,
    native: Mutex<Vec<String>>,
}

impl ScriptedDriver {
    fn reply(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    fn rows(self, rows: Vec<Row>) -> Self {
        self.reply(Reply::Rows(rows))
    }

    fn exec(self, rows_affected: u64, last_insert_id: Option<i64>) -> Self {
        self.reply(Reply::Exec(ExecResult {
            rows_affected,
            last_insert_id,
        }))
    }

    fn table(self, description: TableDescription) -> Self {
        self.tables
            .lock()
            .unwrap()
            .insert(description.name.clone(), description);
        self
    }

    fn record(&self, query: &QueryBuilder) -> Result<(), DataError> {
        let statement = query.build()?;
        self.statements.lock().unwrap().push(statement.sql);
        Ok(())
    }

    fn next(&self) -> Result<Reply, DataError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DataError::Other("no scripted reply left".into()))
    }

    fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

impl Driver for ScriptedDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn native_query(&self, sql: &str) -> Result<ExecResult, DataError> {
        self.native.lock().unwrap().push(sql.to_string());
        Ok(ExecResult::default())
    }

    async fn fetch_all(&self, query: &QueryBuilder) -> Result<Vec<Row>, DataError> {
        self.record(query)?;
        match self.next()? {
            Reply::Rows(rows) => Ok(rows),
            Reply::Exec(_) => Err(DataError::Other("expected a fetch".into())),
        }
    }

    async fn execute(&self, query: &QueryBuilder) -> Result<ExecResult, DataError> {
        self.record(query)?;
        match self.next()? {
            Reply::Exec(result) => Ok(result),
            Reply::Rows(_) => Err(DataError::Other("expected an execute".into())),
        }
    }

    async fn describe_table(&self, table: &str) -> Result<Option<TableDescription>, DataError> {
        Ok(self.tables.lock().unwrap().get(table).cloned())
    }
}

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn user_row(id: i64, username: &str) -> Row {
    row(&[
        ("id", Value::Int(id)),
        ("username", Value::from(username)),
        ("password", Value::from("hash")),
    ])
}

fn total(n: i64) -> Vec<Row> {
    vec![row(&[("total", Value::Int(n))])]
}

fn manager(driver: ScriptedDriver) -> EntityManager<ScriptedDriver> {
    let user = EntityDeclaration::entity("User", "user")
        .field("id", FieldAttribute::new("int").primary())
        .field("username", FieldAttribute::new("string").index(IndexType::Unique))
        .field("password", FieldAttribute::new("string").hidden());
    let orm = Orm::builder()
        .config(OrmConfig {
            dialect: Dialect::Sqlite,
            ..OrmConfig::default()
        })
        .declare(user)
        .build()
        .unwrap();
    orm.entity_manager(driver)
}

#[tokio::test]
async fn test_persist_without_key_inserts_and_reads_back() {
    let em = manager(ScriptedDriver::default().exec(1, Some(7)).rows(vec![user_row(7, "ada")]));
    let state = State::new().with("username", "ada").with("password", "hash");

    let stored = em.persist("User", &state).await.unwrap();
    assert_eq!(stored.get("id"), Some(&Value::Int(7)));
    assert!(stored.is_hidden("password"));
    assert!(!stored.to_map().contains_key("password"));

    let statements = em.driver().statements();
    assert_eq!(
        statements[0],
        r#"INSERT INTO "user" ("username", "password") VALUES (?, ?)"#
    );
    assert!(statements[1].starts_with(r#"SELECT "id", "username", "password" FROM "user" WHERE "id" = ?"#));
}

#[tokio::test]
async fn test_persist_with_auto_increment_key_updates() {
    let em = manager(ScriptedDriver::default().exec(1, None).rows(vec![user_row(3, "grace")]));
    let state = State::new().with("id", 3i64).with("username", "grace");

    let stored = em.persist("User", &state).await.unwrap();
    assert_eq!(stored.get_as::<String>("username").unwrap(), "grace");
    assert!(em.driver().statements()[0].starts_with(r#"UPDATE "user" SET "username" = ?"#));
}

#[tokio::test]
async fn test_unchanged_row_counts_as_updated() {
    let em = manager(
        ScriptedDriver::default()
            .exec(0, None)
            .rows(total(1))
            .rows(vec![user_row(3, "grace")]),
    );
    let state = State::new().with("id", 3i64).with("username", "grace");
    assert!(em.persist("User", &state).await.is_ok());
}

#[tokio::test]
async fn test_updating_missing_row_is_not_found() {
    let em = manager(ScriptedDriver::default().exec(0, None).rows(total(0)));
    let state = State::new().with("id", 9i64).with("username", "nobody");
    let err = em.persist("User", &state).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_find_reports_total_and_id_bounds() {
    let em = manager(
        ScriptedDriver::default()
            .rows(vec![user_row(1, "ada"), user_row(2, "grace")])
            .rows(total(5)),
    );
    let page = em
        .find("User", &State::new(), &Arguments::new().limit(2))
        .await
        .unwrap();

    assert_eq!(page.len(), 2);
    assert_eq!(page.total_count, 5);
    assert_eq!(page.first_id, Some(serde_json::json!(1)));
    assert_eq!(page.last_id, Some(serde_json::json!(2)));
    assert_eq!(em.driver().statements()[1], r#"SELECT COUNT(*) AS total FROM "user""#);
}

#[tokio::test]
async fn test_find_total_counts_filter_arguments() {
    let em = manager(
        ScriptedDriver::default()
            .rows(vec![user_row(1, "ada"), user_row(3, "carol")])
            .rows(total(2)),
    );
    let args = Arguments::new()
        .filter("username", Comparison::NotEq, "bob")
        .limit(10);
    let page = em.find("User", &State::new(), &args).await.unwrap();

    assert_eq!(page.total_count, 2);
    assert_eq!(
        em.driver().statements()[1],
        r#"SELECT COUNT(*) AS total FROM "user" WHERE "username" != ?"#
    );
}

#[tokio::test]
async fn test_delete_with_limit_is_rejected_before_execution() {
    let em = manager(ScriptedDriver::default());
    let err = em
        .delete("User", &State::new(), &Arguments::new().limit(1))
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::Query(QueryError::Unsupported { .. })), "{err}");
    assert!(em.driver().statements().is_empty());
}

#[tokio::test]
async fn test_find_one_miss() {
    let em = manager(ScriptedDriver::default().rows(vec![]).rows(vec![]));
    let state = State::new().with("username", "ghost");

    let err = em.find_one("User", &state, Arguments::new(), true).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(em.find_one("User", &state, Arguments::new(), false).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_class_is_not_registered() {
    let em = manager(ScriptedDriver::default());
    let err = em.count("Invoice", &State::new()).await.unwrap_err();
    assert!(matches!(err, DataError::Mapping(_)));
}

#[tokio::test]
async fn test_sync_schema_creates_missing_tables() {
    let em = manager(ScriptedDriver::default());
    let results = em.sync_schema().await.unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(result.created);
    assert!(result.non_existing_columns.is_empty());
    assert!(result.non_existing_indexes.is_empty());

    let native = em.driver().native.lock().unwrap().clone();
    assert_eq!(native, result.statements);
    assert!(native[0].starts_with(r#"CREATE TABLE IF NOT EXISTS "user""#));
    assert!(native
        .iter()
        .any(|sql| sql.starts_with(r#"CREATE UNIQUE INDEX IF NOT EXISTS "user_username_unique""#)));
}

#[tokio::test]
async fn test_sync_schema_reports_columns_left_in_the_database() {
    let column = |name: &str, sql_type: &str, primary: bool| ColumnDescription {
        name: name.into(),
        sql_type: sql_type.into(),
        nullable: false,
        primary,
    };
    let live = TableDescription {
        name: "user".into(),
        columns: vec![
            column("id", "INTEGER", true),
            column("username", "TEXT", false),
            column("password", "TEXT", false),
            column("legacy", "TEXT", false),
        ],
        indexes: vec![
            IndexDescription {
                name: "PRIMARY".into(),
                unique: true,
                primary: true,
                columns: vec!["id".into()],
            },
            IndexDescription {
                name: "user_username_unique".into(),
                unique: true,
                primary: false,
                columns: vec!["username".into()],
            },
        ],
    };
    let em = manager(ScriptedDriver::default().table(live));

    let results = em.sync_schema().await.unwrap();
    let result = &results[0];
    assert!(!result.created);
    assert!(!result.altered);
    assert_eq!(result.non_existing_columns, ["legacy"]);
    assert!(result.statements.is_empty());
}
