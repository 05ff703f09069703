use std::str::FromStr;

use super::QueryError;
use crate::value::Value;

/// SQL dialect: placeholder style, identifier quoting and DDL flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders (default).
    Generic,
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// MySQL-style `?` placeholders with backtick quoting.
    MySql,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Generic => "generic",
            Dialect::Sqlite => "sqlite",
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
        }
    }

    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    pub(crate) fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }

    /// Quote a single identifier segment.
    pub(crate) fn quote(self, ident: &str) -> String {
        let q = self.quote_char();
        format!("{q}{ident}{q}")
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" => Ok(Dialect::Generic),
            "sqlite" => Ok(Dialect::Sqlite),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(format!("unknown dialect '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Do not validate or quote identifiers.
    Raw,
    /// Validate identifiers against a conservative pattern.
    Validate,
    /// Validate and quote identifiers using the dialect quoting style.
    Quote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Count,
    Insert,
    Update,
    Delete,
}

/// A WHERE predicate. Predicates are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    NotEq(String, Value),
    Like(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    /// Equality against any of the values, rendered as an `OR` group.
    AnyOf(String, Vec<Value>),
    IsNull(String),
    IsNotNull(String),
}

/// Rendered SQL plus its bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// A fluent builder for SELECT, COUNT, INSERT, UPDATE and DELETE statements.
///
/// # Example
///
/// ```ignore
/// let stmt = QueryBuilder::new("users")
///     .where_eq("email", "a@b.com")
///     .where_like("name", "%alice%")
///     .order_by("id", true)
///     .limit(10)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    operation: Operation,
    columns: Vec<String>,
    assignments: Vec<(String, Value)>,
    conditions: Vec<Condition>,
    group: Vec<String>,
    order: Vec<(String, bool)>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    dialect: Dialect,
    identifier_policy: IdentifierPolicy,
}

impl QueryBuilder {
    /// A SELECT over `table`.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            operation: Operation::Select,
            columns: Vec::new(),
            assignments: Vec::new(),
            conditions: Vec::new(),
            group: Vec::new(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            dialect: Dialect::Generic,
            identifier_policy: IdentifierPolicy::Raw,
        }
    }

    pub fn count(table: &str) -> Self {
        Self::new(table).operation(Operation::Count)
    }

    pub fn insert(table: &str) -> Self {
        Self::new(table).operation(Operation::Insert)
    }

    pub fn update(table: &str) -> Self {
        Self::new(table).operation(Operation::Update)
    }

    pub fn delete(table: &str) -> Self {
        Self::new(table).operation(Operation::Delete)
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Set the SQL dialect (affects placeholder style and quoting).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Configure identifier validation/quoting behavior.
    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    /// Restrict the selected columns. Selecting nothing means `*`.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Column assignment for INSERT and UPDATE.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.assignments.push((column.to_string(), value.into()));
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(Condition::Eq(column.to_string(), value.into()))
    }

    pub fn where_not_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(Condition::NotEq(column.to_string(), value.into()))
    }

    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.condition(Condition::Like(column.to_string(), pattern.into()))
    }

    pub fn where_gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(Condition::Gt(column.to_string(), value.into()))
    }

    pub fn where_gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(Condition::Gte(column.to_string(), value.into()))
    }

    pub fn where_lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(Condition::Lt(column.to_string(), value.into()))
    }

    pub fn where_lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(Condition::Lte(column.to_string(), value.into()))
    }

    pub fn where_in(self, column: &str, values: Vec<Value>) -> Self {
        self.condition(Condition::In(column.to_string(), values))
    }

    /// `(column = ? OR column = ? ...)`
    pub fn where_any(self, column: &str, values: Vec<Value>) -> Self {
        self.condition(Condition::AnyOf(column.to_string(), values))
    }

    pub fn where_null(self, column: &str) -> Self {
        self.condition(Condition::IsNull(column.to_string()))
    }

    pub fn where_not_null(self, column: &str) -> Self {
        self.condition(Condition::IsNotNull(column.to_string()))
    }

    pub fn group_by(mut self, column: &str) -> Self {
        self.group.push(column.to_string());
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn get_operation(&self) -> Operation {
        self.operation
    }

    pub fn get_dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn assignments(&self) -> &[(String, Value)] {
        &self.assignments
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit_val
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset_val
    }

    /// Render the statement for the configured operation and dialect.
    pub fn build(&self) -> Result<Statement, QueryError> {
        let table = self.format_identifier(&self.table, false, "table")?;
        let mut params = Vec::new();
        let mut placeholder_idx = 1usize;

        let sql = match self.operation {
            Operation::Select => {
                let columns = if self.columns.is_empty() {
                    "*".to_string()
                } else {
                    self.format_column_list()?
                };
                let mut sql = format!("SELECT {columns} FROM {table}");
                self.append_where(&mut sql, &mut params, &mut placeholder_idx)?;
                self.append_group(&mut sql)?;
                self.append_order(&mut sql)?;
                self.append_limit_offset(&mut sql);
                sql
            }
            Operation::Count => {
                let mut sql = format!("SELECT COUNT(*) AS total FROM {table}");
                self.append_where(&mut sql, &mut params, &mut placeholder_idx)?;
                sql
            }
            Operation::Insert => {
                if self.assignments.is_empty() {
                    match self.dialect {
                        Dialect::MySql => format!("INSERT INTO {table} () VALUES ()"),
                        _ => format!("INSERT INTO {table} DEFAULT VALUES"),
                    }
                } else {
                    let mut columns = Vec::with_capacity(self.assignments.len());
                    let mut placeholders = Vec::with_capacity(self.assignments.len());
                    for (column, value) in &self.assignments {
                        columns.push(self.format_identifier(column, false, "column")?);
                        placeholders.push(self.dialect.placeholder(placeholder_idx));
                        placeholder_idx += 1;
                        params.push(value.clone());
                    }
                    format!(
                        "INSERT INTO {table} ({}) VALUES ({})",
                        columns.join(", "),
                        placeholders.join(", ")
                    )
                }
            }
            Operation::Update => {
                if self.assignments.is_empty() {
                    return Err(QueryError::EmptyAssignments {
                        table: self.table.clone(),
                    });
                }
                let mut sets = Vec::with_capacity(self.assignments.len());
                for (column, value) in &self.assignments {
                    let column = self.format_identifier(column, false, "column")?;
                    sets.push(format!("{column} = {}", self.dialect.placeholder(placeholder_idx)));
                    placeholder_idx += 1;
                    params.push(value.clone());
                }
                let mut sql = format!("UPDATE {table} SET {}", sets.join(", "));
                self.append_where(&mut sql, &mut params, &mut placeholder_idx)?;
                sql
            }
            Operation::Delete => {
                let mut sql = format!("DELETE FROM {table}");
                self.append_where(&mut sql, &mut params, &mut placeholder_idx)?;
                sql
            }
        };
        Ok(Statement { sql, params })
    }

    fn append_where(
        &self,
        sql: &mut String,
        params: &mut Vec<Value>,
        placeholder_idx: &mut usize,
    ) -> Result<(), QueryError> {
        if self.conditions.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(self.conditions.len());
        for cond in &self.conditions {
            let mut next = || {
                let placeholder = self.dialect.placeholder(*placeholder_idx);
                *placeholder_idx += 1;
                placeholder
            };
            let clause = match cond {
                Condition::Eq(col, val)
                | Condition::NotEq(col, val)
                | Condition::Like(col, val)
                | Condition::Gt(col, val)
                | Condition::Gte(col, val)
                | Condition::Lt(col, val)
                | Condition::Lte(col, val) => {
                    let op = match cond {
                        Condition::Eq(..) => "=",
                        Condition::NotEq(..) => "!=",
                        Condition::Like(..) => "LIKE",
                        Condition::Gt(..) => ">",
                        Condition::Gte(..) => ">=",
                        Condition::Lt(..) => "<",
                        _ => "<=",
                    };
                    let col = self.format_identifier(col, false, "column")?;
                    params.push(val.clone());
                    format!("{col} {op} {}", next())
                }
                Condition::In(_, vals) | Condition::AnyOf(_, vals) if vals.is_empty() => {
                    "1 = 0".to_string()
                }
                Condition::In(col, vals) => {
                    let col = self.format_identifier(col, false, "column")?;
                    let placeholders: Vec<_> = vals.iter().map(|_| next()).collect();
                    params.extend(vals.iter().cloned());
                    format!("{col} IN ({})", placeholders.join(", "))
                }
                Condition::AnyOf(col, vals) => {
                    let col = self.format_identifier(col, false, "column")?;
                    let alternatives: Vec<_> =
                        vals.iter().map(|_| format!("{col} = {}", next())).collect();
                    params.extend(vals.iter().cloned());
                    format!("({})", alternatives.join(" OR "))
                }
                Condition::IsNull(col) => {
                    format!("{} IS NULL", self.format_identifier(col, false, "column")?)
                }
                Condition::IsNotNull(col) => {
                    format!("{} IS NOT NULL", self.format_identifier(col, false, "column")?)
                }
            };
            clauses.push(clause);
        }
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
        Ok(())
    }

    fn append_group(&self, sql: &mut String) -> Result<(), QueryError> {
        if self.group.is_empty() {
            return Ok(());
        }
        let mut columns = Vec::with_capacity(self.group.len());
        for col in &self.group {
            columns.push(self.format_identifier(col, false, "column")?);
        }
        sql.push_str(" GROUP BY ");
        sql.push_str(&columns.join(", "));
        Ok(())
    }

    fn append_order(&self, sql: &mut String) -> Result<(), QueryError> {
        if self.order.is_empty() {
            return Ok(());
        }
        sql.push_str(" ORDER BY ");
        let mut clauses = Vec::with_capacity(self.order.len());
        for (col, asc) in &self.order {
            let col = self.format_identifier(col, false, "column")?;
            if *asc {
                clauses.push(format!("{col} ASC"));
            } else {
                clauses.push(format!("{col} DESC"));
            }
        }
        sql.push_str(&clauses.join(", "));
        Ok(())
    }

    fn append_limit_offset(&self, sql: &mut String) {
        if let Some(limit) = self.limit_val {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset_val {
            // MySQL and SQLite only accept OFFSET after a LIMIT.
            if self.limit_val.is_none() {
                match self.dialect {
                    Dialect::MySql => sql.push_str(" LIMIT 18446744073709551615"),
                    Dialect::Sqlite | Dialect::Generic => sql.push_str(" LIMIT -1"),
                    Dialect::Postgres => {}
                }
            }
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    fn format_column_list(&self) -> Result<String, QueryError> {
        let mut out = Vec::with_capacity(self.columns.len());
        for col in &self.columns {
            out.push(self.format_identifier(col, true, "column")?);
        }
        Ok(out.join(", "))
    }

    fn format_identifier(
        &self,
        ident: &str,
        allow_star: bool,
        kind: &'static str,
    ) -> Result<String, QueryError> {
        if self.identifier_policy == IdentifierPolicy::Raw {
            return Ok(ident.to_string());
        }
        if !is_valid_identifier(ident, allow_star) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        match self.identifier_policy {
            IdentifierPolicy::Quote => Ok(quote_identifier(ident, self.dialect, allow_star)),
            IdentifierPolicy::Raw | IdentifierPolicy::Validate => Ok(ident.to_string()),
        }
    }
}

pub(crate) fn is_valid_identifier(ident: &str, allow_star: bool) -> bool {
    if ident.is_empty() {
        return false;
    }
    let parts: Vec<&str> = ident.split('.').collect();
    for (idx, part) in parts.iter().enumerate() {
        if allow_star && *part == "*" {
            return idx + 1 == parts.len();
        }
        if !is_valid_segment(part) {
            return false;
        }
    }
    true
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(ident: &str, dialect: Dialect, allow_star: bool) -> String {
    let parts: Vec<&str> = ident.split('.').collect();
    let last_idx = parts.len().saturating_sub(1);
    parts
        .into_iter()
        .enumerate()
        .map(|(idx, part)| {
            if allow_star && part == "*" && idx == last_idx {
                part.to_string()
            } else {
                dialect.quote(part)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_select() {
        let stmt = QueryBuilder::new("users").build().unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM users");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_complex_query() {
        let stmt = QueryBuilder::new("users")
            .columns(["id", "name"])
            .where_eq("status", "active")
            .where_like("name", "%alice%")
            .order_by("id", true)
            .limit(10)
            .offset(20)
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT id, name FROM users WHERE status = ? AND name LIKE ? ORDER BY id ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(stmt.params, vec![Value::from("active"), Value::from("%alice%")]);
    }

    #[test]
    fn test_any_of_renders_or_group_inside_and_chain() {
        let stmt = QueryBuilder::new("users")
            .where_any("status", vec![Value::from("active"), Value::from("pending")])
            .where_eq("tenant", 3_i64)
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM users WHERE (status = ? OR status = ?) AND tenant = ?"
        );
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let stmt = QueryBuilder::new("users").where_in("id", Vec::new()).build().unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM users WHERE 1 = 0");
    }

    #[test]
    fn test_count_query() {
        let stmt = QueryBuilder::count("users")
            .where_eq("active", true)
            .limit(5)
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) AS total FROM users WHERE active = ?");
        assert_eq!(stmt.params, vec![Value::Bool(true)]);
    }

    #[test]
    fn test_postgres_placeholders_span_set_and_where() {
        let stmt = QueryBuilder::update("users")
            .dialect(Dialect::Postgres)
            .set("name", "bob")
            .where_eq("status", "active")
            .where_in("role", vec!["admin".into(), "user".into()])
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE users SET name = $1 WHERE status = $2 AND role IN ($3, $4)"
        );
        assert_eq!(stmt.params.len(), 4);
    }

    #[test]
    fn test_insert_and_delete() {
        let insert = QueryBuilder::insert("users")
            .dialect(Dialect::MySql)
            .identifier_policy(IdentifierPolicy::Quote)
            .set("email", "a@b.com")
            .set("age", 30_i64)
            .build()
            .unwrap();
        assert_eq!(insert.sql, "INSERT INTO `users` (`email`, `age`) VALUES (?, ?)");

        let empty = QueryBuilder::insert("users").dialect(Dialect::Sqlite).build().unwrap();
        assert_eq!(empty.sql, "INSERT INTO users DEFAULT VALUES");

        let delete = QueryBuilder::delete("users").where_eq("id", 1_i64).build().unwrap();
        assert_eq!(delete.sql, "DELETE FROM users WHERE id = ?");
    }

    #[test]
    fn test_update_without_assignments_fails() {
        let err = QueryBuilder::update("users").build().unwrap_err();
        assert!(matches!(err, QueryError::EmptyAssignments { .. }));
    }

    #[test]
    fn test_checked_identifiers_and_quoting() {
        let stmt = QueryBuilder::new("users")
            .dialect(Dialect::Postgres)
            .identifier_policy(IdentifierPolicy::Quote)
            .columns(["users.id", "users.email"])
            .where_eq("users.email", "a@b.com")
            .group_by("users.id")
            .order_by("users.id", true)
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"users\".\"id\", \"users\".\"email\" FROM \"users\" WHERE \"users\".\"email\" = $1 GROUP BY \"users\".\"id\" ORDER BY \"users\".\"id\" ASC"
        );
    }

    #[test]
    fn test_checked_invalid_identifier() {
        let err = QueryBuilder::new("users;drop")
            .identifier_policy(IdentifierPolicy::Validate)
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_offset_without_limit() {
        let stmt = QueryBuilder::new("users").offset(5).build().unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM users LIMIT -1 OFFSET 5");
    }
}
