use super::IndexType;

/// Derives physical names for indexes, junction tables and foreign keys.
///
/// Implementations must be pure: the same inputs always give the same name.
pub trait NamingStrategy: Send + Sync + 'static {
    fn index_name(&self, table: &str, columns: &[String], kind: IndexType) -> String;

    /// Name of the junction entity joining `tables`.
    fn junction_name(&self, tables: &[&str]) -> String;

    /// Name of a column in another table that references `table.column`.
    fn foreign_key_name(&self, table: &str, column: &str) -> String;
}

/// `<table>_<columns>_<type>` indexes, `<a>_<b>_connection` junctions and
/// `<table>_<column>` foreign keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNamingStrategy;

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

impl NamingStrategy for DefaultNamingStrategy {
    fn index_name(&self, table: &str, columns: &[String], kind: IndexType) -> String {
        if kind == IndexType::Primary {
            return "PRIMARY".to_string();
        }
        sanitize(&format!("{table}_{}_{}", columns.join("_"), kind.as_str()))
    }

    fn junction_name(&self, tables: &[&str]) -> String {
        let mut sorted = tables.to_vec();
        sorted.sort_unstable();
        sanitize(&format!("{}_connection", sorted.join("_")))
    }

    fn foreign_key_name(&self, table: &str, column: &str) -> String {
        sanitize(&format!("{table}_{column}"))
    }
}
