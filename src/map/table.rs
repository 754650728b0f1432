//! Tables, Columns and Keys
//!
//! The relational side of the map. Column identity is the column name
//! within its table.

use std::fmt;

/// Database name used when a table does not name one
pub const DEFAULT_DATABASE: &str = "Default";

/// SQL type of a column
///
/// `Null` is the sentinel for a column whose type could not be resolved,
/// which happens when an externally supplied result set lacks the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Null,
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Double,
    Char,
    Varchar,
    Clob,
    Date,
    Time,
    Timestamp,
    Binary,
}

/// A column of a table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Column {
            name: name.into(),
            sql_type,
        }
    }

    /// Whether the column's type is the unresolved sentinel
    #[inline]
    pub fn is_unresolved(&self) -> bool {
        self.sql_type == SqlType::Null
    }
}

/// Fully qualified table identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName {
    pub database: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub table: String,
}

impl TableName {
    pub fn new(table: impl Into<String>) -> Self {
        TableName {
            database: None,
            catalog: None,
            schema: None,
            table: table.into(),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Database whose data handler serves this table
    pub fn database_name(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in [&self.database, &self.catalog, &self.schema].into_iter().flatten() {
            write!(f, "{}.", part)?;
        }
        f.write_str(&self.table)
    }
}

/// Kind of key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Primary,
    Unique,
    Foreign,
}

/// An ordered list of columns forming a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub name: String,
    pub kind: KeyKind,
    pub columns: Vec<Column>,
}

impl Key {
    pub fn new(name: impl Into<String>, kind: KeyKind, columns: Vec<Column>) -> Self {
        Key {
            name: name.into(),
            kind,
            columns,
        }
    }
}

/// A table and its columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: TableName,
    columns: Vec<Column>,
    primary_key: Option<Key>,
}

impl Table {
    pub fn new(name: TableName) -> Self {
        Table {
            name,
            columns: Vec::new(),
            primary_key: None,
        }
    }

    /// Add a column (replaces a column of the same name)
    pub fn with_column(mut self, name: impl Into<String>, sql_type: SqlType) -> Self {
        let column = Column::new(name, sql_type);
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        self
    }

    /// Declare the primary key from existing column names
    ///
    /// Unknown names are ignored; a key with no known column is not set.
    pub fn with_primary_key(mut self, names: &[&str]) -> Self {
        let columns: Vec<Column> = names.iter().filter_map(|n| self.column(n).cloned()).collect();
        if !columns.is_empty() {
            let key_name = format!("pk_{}", self.name.table);
            self.primary_key = Some(Key::new(key_name, KeyKind::Primary, columns));
        }
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Case-insensitive column lookup (SQL identifiers in filter conditions)
    pub fn column_ignore_case(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key(&self) -> Option<&Key> {
        self.primary_key.as_ref()
    }

    /// Columns of `names`, in order, cloned from this table
    ///
    /// Unknown names produce an unresolved (`SqlType::Null`) column.
    pub fn columns_named(&self, names: &[&str]) -> Vec<Column> {
        names
            .iter()
            .map(|n| {
                self.column(n)
                    .cloned()
                    .unwrap_or_else(|| Column::new(*n, SqlType::Null))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_display() {
        let name = TableName::new("Orders").with_database("Sales").with_schema("dbo");
        assert_eq!(name.to_string(), "Sales.dbo.Orders");
        assert_eq!(name.database_name(), "Sales");
        assert_eq!(TableName::new("Orders").database_name(), DEFAULT_DATABASE);
    }

    #[test]
    fn test_columns_and_primary_key() {
        let table = Table::new(TableName::new("Orders"))
            .with_column("OrderID", SqlType::Integer)
            .with_column("Customer", SqlType::Varchar)
            .with_primary_key(&["OrderID"]);

        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.primary_key().map(|k| k.columns.len()), Some(1));
        assert!(table.column_ignore_case("orderid").is_some());

        let cols = table.columns_named(&["Customer", "Missing"]);
        assert_eq!(cols[0].sql_type, SqlType::Varchar);
        assert!(cols[1].is_unresolved());
    }
}
