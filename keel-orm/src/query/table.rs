use super::{Dialect, QueryError};
use crate::mapping::{Field, Index, IndexType};
use crate::types::{StorageClass, TypeRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableQueryType {
    Create,
    Alter,
    Delete,
}

impl TableQueryType {
    fn as_str(self) -> &'static str {
        match self {
            TableQueryType::Create => "CREATE",
            TableQueryType::Alter => "ALTER",
            TableQueryType::Delete => "DROP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAction {
    Add,
    Modify,
    Drop,
}

impl TableAction {
    /// Render order: drops, then modifications, then additions.
    fn rank(self) -> u8 {
        match self {
            TableAction::Drop => 0,
            TableAction::Modify => 1,
            TableAction::Add => 2,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            TableAction::Add => "ADD",
            TableAction::Modify => "MODIFY",
            TableAction::Drop => "DROP",
        }
    }
}

/// A column as DDL sees it: name, declared type and constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    /// MySQL column type (`VARCHAR(255)`).
    pub declaration: String,
    pub storage: StorageClass,
    pub nullable: bool,
    pub primary: bool,
    pub auto_increment: bool,
}

impl ColumnDefinition {
    pub fn from_field(field: &Field, types: &TypeRegistry) -> Self {
        Self {
            name: field.column.clone(),
            declaration: types.sql_declaration(field),
            storage: types.storage_class(field),
            nullable: field.nullable && !field.primary,
            primary: field.primary,
            auto_increment: field.auto_increment,
        }
    }

    /// A column known only by name, for DROP actions.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declaration: String::new(),
            storage: StorageClass::Text,
            nullable: true,
            primary: false,
            auto_increment: false,
        }
    }

    /// Declared type for `dialect`: the full MySQL type or the SQLite affinity.
    pub fn sql_type(&self, dialect: Dialect) -> &str {
        match dialect {
            Dialect::Sqlite => self.storage.as_sql(),
            _ => &self.declaration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: String,
    pub kind: IndexType,
    pub columns: Vec<String>,
}

impl From<&Index> for IndexDefinition {
    fn from(index: &Index) -> Self {
        Self {
            name: index.name.clone(),
            kind: index.kind,
            columns: index.columns.clone(),
        }
    }
}

impl IndexDefinition {
    pub fn named(name: impl Into<String>, kind: IndexType) -> Self {
        Self {
            name: name.into(),
            kind,
            columns: Vec::new(),
        }
    }
}

/// A CREATE, ALTER or DROP of one table.
///
/// Field and index actions render drops first, then modifications, then
/// additions, whatever order they were added in.
#[derive(Debug, Clone)]
pub struct TableQuery {
    table: String,
    kind: TableQueryType,
    engine: Option<String>,
    comment: Option<String>,
    fields: Vec<(TableAction, ColumnDefinition)>,
    indexes: Vec<(TableAction, IndexDefinition)>,
}

impl TableQuery {
    fn new(table: &str, kind: TableQueryType) -> Self {
        Self {
            table: table.to_string(),
            kind,
            engine: None,
            comment: None,
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn create(table: &str) -> Self {
        Self::new(table, TableQueryType::Create)
    }

    pub fn alter(table: &str) -> Self {
        Self::new(table, TableQueryType::Alter)
    }

    pub fn delete(table: &str) -> Self {
        Self::new(table, TableQueryType::Delete)
    }

    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    pub fn kind(&self) -> TableQueryType {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn check(&self, action: TableAction) -> Result<(), QueryError> {
        let allowed = match self.kind {
            TableQueryType::Create => action == TableAction::Add,
            TableQueryType::Alter => true,
            TableQueryType::Delete => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(QueryError::InvalidTableAction {
                table: self.table.clone(),
                action: action.as_str(),
                statement: self.kind.as_str(),
            })
        }
    }

    pub fn add_field(&mut self, action: TableAction, column: ColumnDefinition) -> Result<&mut Self, QueryError> {
        self.check(action)?;
        self.fields.push((action, column));
        Ok(self)
    }

    pub fn add_index(&mut self, action: TableAction, index: IndexDefinition) -> Result<&mut Self, QueryError> {
        self.check(action)?;
        self.indexes.push((action, index));
        Ok(self)
    }

    /// Whether an ALTER has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.indexes.is_empty()
    }

    pub fn fields(&self) -> Vec<&(TableAction, ColumnDefinition)> {
        let mut ordered: Vec<_> = self.fields.iter().collect();
        ordered.sort_by_key(|(action, _)| action.rank());
        ordered
    }

    pub fn indexes(&self) -> Vec<&(TableAction, IndexDefinition)> {
        let mut ordered: Vec<_> = self.indexes.iter().collect();
        ordered.sort_by_key(|(action, _)| action.rank());
        ordered
    }

    fn index_actions(&self, wanted: &[TableAction]) -> Vec<&(TableAction, IndexDefinition)> {
        self.indexes()
            .into_iter()
            .filter(|(action, _)| wanted.contains(action))
            .collect()
    }

    /// Render the statements to run, in order.
    pub fn statements(&self, dialect: Dialect) -> Result<Vec<String>, QueryError> {
        match dialect {
            Dialect::MySql => Ok(self.mysql()),
            Dialect::Sqlite => self.sqlite(),
            Dialect::Generic | Dialect::Postgres => Err(QueryError::Unsupported {
                dialect: dialect.name(),
                what: "table DDL".to_string(),
            }),
        }
    }

    fn quoted_list(dialect: Dialect, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| dialect.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn mysql_column(column: &ColumnDefinition) -> String {
        let mut sql = format!("{} {}", Dialect::MySql.quote(&column.name), column.declaration);
        sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        if column.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        sql
    }

    fn mysql_index(index: &IndexDefinition) -> String {
        let columns = Self::quoted_list(Dialect::MySql, &index.columns);
        let name = Dialect::MySql.quote(&index.name);
        match index.kind {
            IndexType::Primary => format!("PRIMARY KEY ({columns})"),
            IndexType::Index => format!("INDEX {name} ({columns})"),
            IndexType::Unique => format!("CONSTRAINT {name} UNIQUE ({columns})"),
        }
    }

    fn mysql_drop_index(index: &IndexDefinition) -> String {
        match index.kind {
            IndexType::Primary => "DROP PRIMARY KEY".to_string(),
            IndexType::Index => format!("DROP INDEX IF EXISTS {}", Dialect::MySql.quote(&index.name)),
            IndexType::Unique => format!("DROP CONSTRAINT IF EXISTS {}", Dialect::MySql.quote(&index.name)),
        }
    }

    fn mysql(&self) -> Vec<String> {
        let table = Dialect::MySql.quote(&self.table);
        match self.kind {
            TableQueryType::Delete => vec![format!("DROP TABLE IF EXISTS {table}")],
            TableQueryType::Create => {
                let mut parts: Vec<String> =
                    self.fields().iter().map(|(_, c)| Self::mysql_column(c)).collect();
                parts.extend(self.indexes().iter().map(|(_, i)| Self::mysql_index(i)));
                let mut sql = format!("CREATE TABLE IF NOT EXISTS {table} ({})", parts.join(", "));
                if let Some(engine) = &self.engine {
                    sql.push_str(&format!(" ENGINE={engine}"));
                }
                if let Some(comment) = &self.comment {
                    sql.push_str(&format!(" COMMENT='{}'", comment.replace('\'', "''")));
                }
                vec![sql]
            }
            TableQueryType::Alter => {
                let mut parts = Vec::new();
                for (_, index) in self.index_actions(&[TableAction::Drop]) {
                    parts.push(Self::mysql_drop_index(index));
                }
                for (action, column) in self.fields() {
                    parts.push(match action {
                        TableAction::Drop => format!("DROP COLUMN {}", Dialect::MySql.quote(&column.name)),
                        TableAction::Modify => format!("MODIFY COLUMN {}", Self::mysql_column(column)),
                        TableAction::Add => format!("ADD COLUMN {}", Self::mysql_column(column)),
                    });
                }
                for (action, index) in self.index_actions(&[TableAction::Modify, TableAction::Add]) {
                    if *action == TableAction::Modify {
                        parts.push(Self::mysql_drop_index(index));
                    }
                    parts.push(format!("ADD {}", Self::mysql_index(index)));
                }
                if parts.is_empty() {
                    return Vec::new();
                }
                vec![format!("ALTER TABLE {table} {}", parts.join(", "))]
            }
        }
    }

    fn sqlite_column(column: &ColumnDefinition, adding: bool) -> String {
        let mut sql = format!("{} {}", Dialect::Sqlite.quote(&column.name), column.storage.as_sql());
        if column.primary && column.auto_increment {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT NOT NULL");
        } else if !column.nullable {
            sql.push_str(" NOT NULL");
            if adding {
                // SQLite cannot add a NOT NULL column without a default.
                sql.push_str(match column.storage {
                    StorageClass::Integer | StorageClass::Real => " DEFAULT 0",
                    StorageClass::Text | StorageClass::Blob => " DEFAULT ''",
                });
            }
        }
        sql
    }

    fn sqlite_create_index(&self, index: &IndexDefinition) -> Result<String, QueryError> {
        let unique = match index.kind {
            IndexType::Primary => {
                return Err(QueryError::Unsupported {
                    dialect: "sqlite",
                    what: "altering a primary key".to_string(),
                })
            }
            IndexType::Index => "",
            IndexType::Unique => "UNIQUE ",
        };
        Ok(format!(
            "CREATE {unique}INDEX IF NOT EXISTS {} ON {} ({})",
            Dialect::Sqlite.quote(&index.name),
            Dialect::Sqlite.quote(&self.table),
            Self::quoted_list(Dialect::Sqlite, &index.columns)
        ))
    }

    fn sqlite_drop_index(index: &IndexDefinition) -> Result<String, QueryError> {
        if index.kind == IndexType::Primary {
            return Err(QueryError::Unsupported {
                dialect: "sqlite",
                what: "dropping a primary key".to_string(),
            });
        }
        Ok(format!("DROP INDEX IF EXISTS {}", Dialect::Sqlite.quote(&index.name)))
    }

    fn sqlite(&self) -> Result<Vec<String>, QueryError> {
        let table = Dialect::Sqlite.quote(&self.table);
        let mut statements = Vec::new();
        match self.kind {
            TableQueryType::Delete => statements.push(format!("DROP TABLE IF EXISTS {table}")),
            TableQueryType::Create => {
                let fields = self.fields();
                let mut parts: Vec<String> =
                    fields.iter().map(|(_, c)| Self::sqlite_column(c, false)).collect();
                let inline_key = fields.iter().any(|(_, c)| c.primary && c.auto_increment);
                for (_, index) in self.indexes() {
                    if index.kind == IndexType::Primary && !inline_key {
                        parts.push(format!(
                            "PRIMARY KEY ({})",
                            Self::quoted_list(Dialect::Sqlite, &index.columns)
                        ));
                    }
                }
                statements.push(format!("CREATE TABLE IF NOT EXISTS {table} ({})", parts.join(", ")));
                for (_, index) in self.indexes() {
                    if index.kind != IndexType::Primary {
                        statements.push(self.sqlite_create_index(index)?);
                    }
                }
            }
            TableQueryType::Alter => {
                for (_, index) in self.index_actions(&[TableAction::Drop]) {
                    statements.push(Self::sqlite_drop_index(index)?);
                }
                for (action, column) in self.fields() {
                    match action {
                        TableAction::Drop => statements.push(format!(
                            "ALTER TABLE {table} DROP COLUMN {}",
                            Dialect::Sqlite.quote(&column.name)
                        )),
                        TableAction::Modify => {
                            return Err(QueryError::Unsupported {
                                dialect: "sqlite",
                                what: format!("MODIFY COLUMN {}", column.name),
                            })
                        }
                        TableAction::Add if column.primary => {
                            return Err(QueryError::Unsupported {
                                dialect: "sqlite",
                                what: format!("adding primary key column {}", column.name),
                            })
                        }
                        TableAction::Add => statements.push(format!(
                            "ALTER TABLE {table} ADD COLUMN {}",
                            Self::sqlite_column(column, true)
                        )),
                    }
                }
                for (action, index) in self.index_actions(&[TableAction::Modify, TableAction::Add]) {
                    if *action == TableAction::Modify {
                        statements.push(Self::sqlite_drop_index(index)?);
                    }
                    statements.push(self.sqlite_create_index(index)?);
                }
            }
        }
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, declaration: &str) -> ColumnDefinition {
        ColumnDefinition {
            name: name.into(),
            declaration: declaration.into(),
            storage: StorageClass::Text,
            nullable: false,
            primary: false,
            auto_increment: false,
        }
    }

    fn id() -> ColumnDefinition {
        ColumnDefinition {
            name: "id".into(),
            declaration: "INT(11)".into(),
            storage: StorageClass::Integer,
            nullable: false,
            primary: true,
            auto_increment: true,
        }
    }

    fn index(name: &str, kind: IndexType, columns: &[&str]) -> IndexDefinition {
        IndexDefinition {
            name: name.into(),
            kind,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn create_rejects_modify_and_drop() {
        let mut query = TableQuery::create("user");
        assert!(matches!(
            query.add_field(TableAction::Modify, column("name", "VARCHAR(255)")),
            Err(QueryError::InvalidTableAction { action: "MODIFY", .. })
        ));
        assert!(query
            .add_index(TableAction::Drop, index("user_name_index", IndexType::Index, &["name"]))
            .is_err());
        assert!(query.is_empty());
    }

    #[test]
    fn alter_orders_drop_modify_add() {
        let mut query = TableQuery::alter("user");
        query.add_field(TableAction::Add, column("nickname", "VARCHAR(64)")).unwrap();
        query.add_field(TableAction::Modify, column("email", "VARCHAR(128)")).unwrap();
        query.add_field(TableAction::Drop, ColumnDefinition::named("legacy")).unwrap();
        query.add_field(TableAction::Add, column("bio", "TEXT")).unwrap();

        let actions: Vec<_> = query.fields().iter().map(|(a, c)| (*a, c.name.clone())).collect();
        assert_eq!(
            actions,
            [
                (TableAction::Drop, "legacy".to_string()),
                (TableAction::Modify, "email".to_string()),
                (TableAction::Add, "nickname".to_string()),
                (TableAction::Add, "bio".to_string()),
            ]
        );
        assert_eq!(
            query.statements(Dialect::MySql).unwrap(),
            ["ALTER TABLE `user` DROP COLUMN `legacy`, MODIFY COLUMN `email` VARCHAR(128) NOT NULL, \
              ADD COLUMN `nickname` VARCHAR(64) NOT NULL, ADD COLUMN `bio` TEXT NOT NULL"]
        );
    }

    #[test]
    fn mysql_create_renders_indexes_engine_and_comment() {
        let mut query = TableQuery::create("user")
            .engine("InnoDB")
            .comment(Some("app's users".into()));
        query.add_field(TableAction::Add, id()).unwrap();
        query.add_field(TableAction::Add, column("email", "VARCHAR(255)")).unwrap();
        query.add_index(TableAction::Add, index("PRIMARY", IndexType::Primary, &["id"])).unwrap();
        query
            .add_index(TableAction::Add, index("user_email_unique", IndexType::Unique, &["email"]))
            .unwrap();
        assert_eq!(
            query.statements(Dialect::MySql).unwrap(),
            ["CREATE TABLE IF NOT EXISTS `user` (`id` INT(11) NOT NULL AUTO_INCREMENT, \
              `email` VARCHAR(255) NOT NULL, PRIMARY KEY (`id`), \
              CONSTRAINT `user_email_unique` UNIQUE (`email`)) ENGINE=InnoDB COMMENT='app''s users'"]
        );
    }

    #[test]
    fn sqlite_create_uses_separate_index_statements() {
        let mut query = TableQuery::create("post");
        query.add_field(TableAction::Add, id()).unwrap();
        let mut fk = column("user_id", "INT(11)");
        fk.storage = StorageClass::Integer;
        fk.nullable = true;
        query.add_field(TableAction::Add, fk).unwrap();
        query.add_index(TableAction::Add, index("PRIMARY", IndexType::Primary, &["id"])).unwrap();
        query
            .add_index(TableAction::Add, index("post_user_id_index", IndexType::Index, &["user_id"]))
            .unwrap();
        assert_eq!(
            query.statements(Dialect::Sqlite).unwrap(),
            [
                "CREATE TABLE IF NOT EXISTS \"post\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \"user_id\" INTEGER)",
                "CREATE INDEX IF NOT EXISTS \"post_user_id_index\" ON \"post\" (\"user_id\")",
            ]
        );
    }

    #[test]
    fn sqlite_cannot_modify_columns() {
        let mut query = TableQuery::alter("post");
        query.add_field(TableAction::Modify, column("title", "VARCHAR(64)")).unwrap();
        assert!(matches!(
            query.statements(Dialect::Sqlite),
            Err(QueryError::Unsupported { dialect: "sqlite", .. })
        ));
    }

    #[test]
    fn empty_alter_renders_nothing_and_delete_drops() {
        assert!(TableQuery::alter("user").statements(Dialect::MySql).unwrap().is_empty());
        assert_eq!(
            TableQuery::delete("user").statements(Dialect::Sqlite).unwrap(),
            ["DROP TABLE IF EXISTS \"user\""]
        );
    }
}
