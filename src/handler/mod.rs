//! Data Handler Module
//!
//! The relational side of a transfer is reached only through these traits:
//! - `DataHandler`: issues SELECT/DELETE statements for one database
//! - `Cursor`: row-by-row access to a SELECT result
//! - `DataHandlers`: one handler per database named in the map

pub mod memory;

pub use memory::{Call, MemoryCursor, MemoryDataHandler, MemoryDatabase};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{DatabaseError, DbmsError, Result};
use crate::map::{Column, OrderInfo, Table, TableName, DEFAULT_DATABASE};
use crate::value::Value;

/// When a handler commits the statements of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Commit after every statement
    AfterStatement,
    /// Commit once, after the whole document
    AfterDocument,
    /// Never commit; the caller does
    None,
    /// The database does not support transactions
    NoTransactions,
}

impl FromStr for CommitMode {
    type Err = DbmsError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .trim_start_matches("COMMIT_")
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "afterstatement" => Ok(CommitMode::AfterStatement),
            "afterdocument" => Ok(CommitMode::AfterDocument),
            "none" => Ok(CommitMode::None),
            "notransactions" => Ok(CommitMode::NoTransactions),
            _ => Err(DbmsError::InvalidCommitMode(s.to_string())),
        }
    }
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitMode::AfterStatement => "AfterStatement",
            CommitMode::AfterDocument => "AfterDocument",
            CommitMode::None => "None",
            CommitMode::NoTransactions => "NoTransactions",
        };
        f.write_str(name)
    }
}

/// Key equality restriction: `columns[i] = values[i]` for every i
#[derive(Debug, Clone, Copy)]
pub struct KeyFilter<'a> {
    pub columns: &'a [Column],
    pub values: &'a [Value],
}

/// A SELECT issued by a table walk
#[derive(Debug, Clone, Copy)]
pub struct SelectQuery<'a> {
    pub table: &'a Table,
    pub key: Option<KeyFilter<'a>>,
    /// WHERE fragment with `?` placeholders, never empty when present
    pub where_clause: Option<&'a str>,
    pub param_columns: Option<&'a [Column]>,
    pub param_values: Option<&'a [Value]>,
    pub order: Option<&'a OrderInfo>,
}

impl<'a> SelectQuery<'a> {
    /// Unrestricted, unordered SELECT of every column of `table`
    pub fn table(table: &'a Table) -> Self {
        SelectQuery {
            table,
            key: None,
            where_clause: None,
            param_columns: None,
            param_values: None,
            order: None,
        }
    }
}

/// A DELETE issued by the deletion walk
#[derive(Debug, Clone, Copy)]
pub struct DeleteQuery<'a> {
    pub table: &'a Table,
    pub key: Option<KeyFilter<'a>>,
    pub where_clause: Option<&'a str>,
    pub param_columns: Option<&'a [Column]>,
    pub param_values: Option<&'a [Value]>,
}

/// Row-by-row access to a result
pub trait Cursor {
    /// Move to the next row; false once the rows are exhausted
    fn advance(&mut self) -> std::result::Result<bool, DatabaseError>;

    /// Value of `column` in the current row
    ///
    /// Ok(None) means the result does not carry the column at all.
    fn value(&self, column: &Column) -> std::result::Result<Option<Value>, DatabaseError>;
}

/// Statement execution for one database
pub trait DataHandler {
    fn select(&mut self, query: &SelectQuery<'_>) -> std::result::Result<Box<dyn Cursor>, DatabaseError>;

    /// Delete matching rows and return how many were deleted
    fn delete(&mut self, query: &DeleteQuery<'_>) -> std::result::Result<u64, DatabaseError>;

    fn start_document(&mut self, _commit_mode: CommitMode) -> std::result::Result<(), DatabaseError> {
        Ok(())
    }

    fn end_document(&mut self) -> std::result::Result<(), DatabaseError> {
        Ok(())
    }

    /// Roll back whatever the current document did, where the commit mode allows
    fn recover_from_exception(&mut self) -> std::result::Result<(), DatabaseError> {
        Ok(())
    }
}

/// Data handlers keyed by database name
#[derive(Default)]
pub struct DataHandlers {
    handlers: BTreeMap<String, Box<dyn DataHandler>>,
}

impl DataHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with one handler for the default database
    pub fn single(handler: impl DataHandler + 'static) -> Self {
        let mut handlers = Self::new();
        handlers.register(DEFAULT_DATABASE, handler);
        handlers
    }

    pub fn register(&mut self, database: impl Into<String>, handler: impl DataHandler + 'static) {
        self.handlers.insert(database.into(), Box::new(handler));
    }

    /// Handler serving `table`
    pub fn for_table(&mut self, table: &TableName) -> Result<&mut dyn DataHandler> {
        let database = table.database_name();
        match self.handlers.get_mut(database) {
            Some(handler) => Ok(handler.as_mut()),
            None => Err(DbmsError::MissingHandler(database.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Every registered handler, in database-name order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut dyn DataHandler)> {
        self.handlers
            .iter_mut()
            .map(|(name, h)| (name.as_str(), h.as_mut() as &mut dyn DataHandler))
    }
}

impl fmt::Debug for DataHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataHandlers")
            .field("databases", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_mode_parse() {
        assert_eq!("AfterDocument".parse::<CommitMode>().unwrap(), CommitMode::AfterDocument);
        assert_eq!("COMMIT_AFTERSTATEMENT".parse::<CommitMode>().unwrap(), CommitMode::AfterStatement);
        assert_eq!("no_transactions".parse::<CommitMode>().unwrap(), CommitMode::NoTransactions);
        assert_eq!(" none ".parse::<CommitMode>().unwrap(), CommitMode::None);

        let err = "sometimes".parse::<CommitMode>().unwrap_err();
        assert!(matches!(err, DbmsError::InvalidCommitMode(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_handler() {
        let mut handlers = DataHandlers::single(MemoryDataHandler::new(MemoryDatabase::shared()));
        assert!(handlers.for_table(&TableName::new("Orders")).is_ok());

        let err = handlers
            .for_table(&TableName::new("Parts").with_database("Inventory"))
            .err()
            .unwrap();
        assert!(matches!(err, DbmsError::MissingHandler(ref db) if db == "Inventory"));
    }
}
