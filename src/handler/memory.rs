//! In-Memory Data Handler
//!
//! A `DataHandler` over plain `Vec<Vec<Value>>` tables. Key restrictions are
//! evaluated directly; WHERE fragments are matched by their exact text against
//! predicates registered up front, since there is no SQL engine behind it.
//!
//! The database lives behind `Rc<RefCell<..>>` so a caller can keep a handle
//! for inspection after the handler has been moved into a `DataHandlers`.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::DatabaseError;
use crate::handler::{CommitMode, Cursor, DataHandler, DeleteQuery, KeyFilter, SelectQuery};
use crate::map::{Column, Table};
use crate::value::Value;

/// Predicate standing in for one WHERE fragment; receives the row and the
/// parameter values in placeholder order
pub type Predicate = Box<dyn Fn(&MemoryRow<'_>, &[Value]) -> bool>;

/// One stored table
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    /// Append a row; values are in column order
    pub fn push(&mut self, row: Vec<Value>) -> &mut Self {
        self.rows.push(row);
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Read access to a stored row by column name
pub struct MemoryRow<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> MemoryRow<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }
}

/// A statement or transaction call received by the handler
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    StartDocument(CommitMode),
    Select {
        table: String,
        key: Vec<Value>,
        where_clause: Option<String>,
        params: Vec<Value>,
    },
    Delete {
        table: String,
        key: Vec<Value>,
        where_clause: Option<String>,
        params: Vec<Value>,
        rows: u64,
    },
    EndDocument,
    Recover,
}

impl Call {
    /// Table name for statement calls
    pub fn table(&self) -> Option<&str> {
        match self {
            Call::Select { table, .. } | Call::Delete { table, .. } => Some(table),
            _ => None,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Call::Delete { .. })
    }
}

/// Tables, predicates and the call log
#[derive(Default)]
pub struct MemoryDatabase {
    tables: HashMap<String, MemoryTable>,
    predicates: HashMap<String, Predicate>,
    delete_failures: HashMap<String, DatabaseError>,
    snapshot: Option<HashMap<String, MemoryTable>>,
    calls: Vec<Call>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// New empty database behind a shared handle
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Create (or replace) a table and return it for filling
    pub fn create_table(&mut self, name: &str, columns: &[&str]) -> &mut MemoryTable {
        let table = MemoryTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        };
        let slot = self.tables.entry(name.to_string()).or_default();
        *slot = table;
        slot
    }

    /// Register the predicate evaluated for a WHERE fragment
    pub fn register_predicate<F>(&mut self, where_clause: &str, predicate: F)
    where
        F: Fn(&MemoryRow<'_>, &[Value]) -> bool + 'static,
    {
        self.predicates.insert(where_clause.to_string(), Box::new(predicate));
    }

    /// Make every DELETE against `table` fail with `error`
    pub fn fail_deletes(&mut self, table: &str, error: DatabaseError) {
        self.delete_failures.insert(table.to_string(), error);
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }

    pub fn row_count(&self, name: &str) -> usize {
        self.tables.get(name).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }
}

impl fmt::Debug for MemoryDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDatabase")
            .field("tables", &self.tables)
            .field("predicates", &self.predicates.keys().collect::<Vec<_>>())
            .field("calls", &self.calls.len())
            .finish()
    }
}

/// `DataHandler` backed by a shared [`MemoryDatabase`]
#[derive(Debug, Clone)]
pub struct MemoryDataHandler {
    db: Rc<RefCell<MemoryDatabase>>,
    commit_mode: Option<CommitMode>,
}

impl MemoryDataHandler {
    pub fn new(db: Rc<RefCell<MemoryDatabase>>) -> Self {
        MemoryDataHandler {
            db,
            commit_mode: None,
        }
    }

    pub fn database(&self) -> Rc<RefCell<MemoryDatabase>> {
        Rc::clone(&self.db)
    }
}

/// Restriction shared by SELECT and DELETE
struct RowFilter<'q> {
    key: Option<KeyFilter<'q>>,
    where_clause: Option<&'q str>,
    params: &'q [Value],
}

impl<'q> RowFilter<'q> {
    fn key_indexes(&self, table: &MemoryTable, name: &str) -> Result<Vec<usize>, DatabaseError> {
        let Some(key) = self.key else {
            return Ok(Vec::new());
        };
        if key.columns.len() != key.values.len() {
            return Err(DatabaseError::statement(format!(
                "{} key columns but {} key values for {}",
                key.columns.len(),
                key.values.len(),
                name
            )));
        }
        key.columns
            .iter()
            .map(|c| {
                table.index_of(&c.name).ok_or_else(|| {
                    DatabaseError::statement(format!("unknown column {}.{}", name, c.name))
                })
            })
            .collect()
    }

    fn predicate<'p>(
        &self,
        predicates: &'p HashMap<String, Predicate>,
    ) -> Result<Option<&'p Predicate>, DatabaseError> {
        match self.where_clause {
            None => Ok(None),
            Some(text) => predicates.get(text).map(Some).ok_or_else(|| {
                DatabaseError::statement(format!("no predicate registered for WHERE {}", text))
            }),
        }
    }

    fn key_values(&self) -> Vec<Value> {
        self.key.map(|k| k.values.to_vec()).unwrap_or_default()
    }
}

fn row_matches(
    columns: &[String],
    row: &[Value],
    key_indexes: &[usize],
    filter: &RowFilter<'_>,
    predicate: Option<&Predicate>,
) -> bool {
    if let Some(key) = filter.key {
        let key_match = key_indexes
            .iter()
            .zip(key.values)
            .all(|(&i, v)| row.get(i).map(|r| !r.is_null() && r == v).unwrap_or(false));
        if !key_match {
            return false;
        }
    }
    match predicate {
        Some(p) => p(&MemoryRow { columns, values: row }, filter.params),
        None => true,
    }
}

/// SQL-like comparison: numbers numerically, NULL after everything
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn table_key(table: &Table) -> String {
    table.name.to_string()
}

impl DataHandler for MemoryDataHandler {
    fn select(&mut self, query: &SelectQuery<'_>) -> Result<Box<dyn Cursor>, DatabaseError> {
        let name = table_key(query.table);
        let filter = RowFilter {
            key: query.key,
            where_clause: query.where_clause,
            params: query.param_values.unwrap_or(&[]),
        };

        let mut guard = self.db.borrow_mut();
        let db = &mut *guard;
        let table = db
            .tables
            .get(&name)
            .ok_or_else(|| DatabaseError::statement(format!("no such table {}", name)))?;
        let key_indexes = filter.key_indexes(table, &name)?;
        let predicate = filter.predicate(&db.predicates)?;

        let mut rows: Vec<Vec<Value>> = table
            .rows
            .iter()
            .filter(|r| row_matches(&table.columns, r, &key_indexes, &filter, predicate))
            .cloned()
            .collect();

        if let Some(order_column) = query.order.and_then(|o| o.order_column()) {
            if let Some(i) = table.index_of(&order_column.name) {
                let ascending = query.order.map(|o| o.ascending).unwrap_or(true);
                rows.sort_by(|a, b| {
                    let ord = compare_values(&a[i], &b[i]);
                    if ascending {
                        ord
                    } else {
                        ord.reverse()
                    }
                });
            }
        }

        let columns = table.columns.clone();
        db.calls.push(Call::Select {
            table: name,
            key: filter.key_values(),
            where_clause: filter.where_clause.map(str::to_string),
            params: filter.params.to_vec(),
        });
        Ok(Box::new(MemoryCursor::new(columns, rows)))
    }

    fn delete(&mut self, query: &DeleteQuery<'_>) -> Result<u64, DatabaseError> {
        let name = table_key(query.table);
        let filter = RowFilter {
            key: query.key,
            where_clause: query.where_clause,
            params: query.param_values.unwrap_or(&[]),
        };

        let mut guard = self.db.borrow_mut();
        let db = &mut *guard;
        if let Some(error) = db.delete_failures.get(&name) {
            return Err(error.clone());
        }
        let table = db
            .tables
            .get_mut(&name)
            .ok_or_else(|| DatabaseError::statement(format!("no such table {}", name)))?;
        let key_indexes = filter.key_indexes(table, &name)?;
        let predicate = filter.predicate(&db.predicates)?;

        let before = table.rows.len();
        let columns = &table.columns;
        table
            .rows
            .retain(|r| !row_matches(columns, r, &key_indexes, &filter, predicate));
        let deleted = (before - table.rows.len()) as u64;

        db.calls.push(Call::Delete {
            table: name,
            key: filter.key_values(),
            where_clause: filter.where_clause.map(str::to_string),
            params: filter.params.to_vec(),
            rows: deleted,
        });
        Ok(deleted)
    }

    fn start_document(&mut self, commit_mode: CommitMode) -> Result<(), DatabaseError> {
        let mut db = self.db.borrow_mut();
        // Rows can only be restored when nothing was committed per statement
        db.snapshot = match commit_mode {
            CommitMode::AfterDocument | CommitMode::None => Some(db.tables.clone()),
            CommitMode::AfterStatement | CommitMode::NoTransactions => None,
        };
        db.calls.push(Call::StartDocument(commit_mode));
        self.commit_mode = Some(commit_mode);
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), DatabaseError> {
        let mut db = self.db.borrow_mut();
        db.snapshot = None;
        db.calls.push(Call::EndDocument);
        self.commit_mode = None;
        Ok(())
    }

    fn recover_from_exception(&mut self) -> Result<(), DatabaseError> {
        let mut db = self.db.borrow_mut();
        if let Some(tables) = db.snapshot.take() {
            db.tables = tables;
        }
        db.calls.push(Call::Recover);
        self.commit_mode = None;
        Ok(())
    }
}

/// Cursor over materialized rows
///
/// Also the way to hand an externally built result set to a result-set
/// filter.
#[derive(Debug, Clone)]
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    position: Option<usize>,
}

impl MemoryCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        MemoryCursor {
            columns,
            rows,
            position: None,
        }
    }

    /// Build from column names and rows given as slices
    pub fn from_rows(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }
}

impl Cursor for MemoryCursor {
    fn advance(&mut self) -> Result<bool, DatabaseError> {
        let next = self.position.map(|p| p + 1).unwrap_or(0);
        if next < self.rows.len() {
            self.position = Some(next);
            Ok(true)
        } else {
            self.position = Some(self.rows.len());
            Ok(false)
        }
    }

    fn value(&self, column: &Column) -> Result<Option<Value>, DatabaseError> {
        let Some(index) = self.columns.iter().position(|c| *c == column.name) else {
            return Ok(None);
        };
        match self.position.and_then(|p| self.rows.get(p)) {
            Some(row) => Ok(Some(row.get(index).cloned().unwrap_or(Value::Null))),
            None => Err(DatabaseError::statement("cursor is not positioned on a row")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{OrderInfo, SqlType, TableName};

    fn items_table() -> Table {
        Table::new(TableName::new("Items"))
            .with_column("OrderID", SqlType::Integer)
            .with_column("Line", SqlType::Integer)
            .with_column("Part", SqlType::Varchar)
    }

    fn items_db() -> Rc<RefCell<MemoryDatabase>> {
        let db = MemoryDatabase::shared();
        db.borrow_mut()
            .create_table("Items", &["OrderID", "Line", "Part"])
            .push(vec![1.into(), 2.into(), "bolt".into()])
            .push(vec![1.into(), 1.into(), "nut".into()])
            .push(vec![2.into(), 1.into(), "gear".into()]);
        db
    }

    fn drain(cursor: &mut dyn Cursor, column: &Column) -> Vec<Value> {
        let mut out = Vec::new();
        while cursor.advance().unwrap() {
            out.push(cursor.value(column).unwrap().unwrap());
        }
        out
    }

    #[test]
    fn test_select_by_key_ordered() {
        let db = items_db();
        let mut handler = MemoryDataHandler::new(db.clone());
        let table = items_table();
        let key_cols = table.columns_named(&["OrderID"]);
        let key_vals = [Value::Int(1)];
        let order = OrderInfo::column(table.columns_named(&["Line"]).remove(0), true);

        let query = SelectQuery {
            key: Some(KeyFilter { columns: &key_cols, values: &key_vals }),
            order: Some(&order),
            ..SelectQuery::table(&table)
        };
        let mut cursor = handler.select(&query).unwrap();
        let part = Column::new("Part", SqlType::Varchar);
        assert_eq!(drain(cursor.as_mut(), &part), vec![Value::from("nut"), Value::from("bolt")]);

        assert_eq!(db.borrow().calls().len(), 1);
        assert_eq!(db.borrow().calls()[0].table(), Some("Items"));
    }

    #[test]
    fn test_where_predicate_required() {
        let db = items_db();
        let mut handler = MemoryDataHandler::new(db.clone());
        let table = items_table();
        let params = [Value::from("gear")];
        let query = SelectQuery {
            where_clause: Some("(Part = ?)"),
            param_values: Some(&params),
            ..SelectQuery::table(&table)
        };
        assert!(handler.select(&query).is_err());

        db.borrow_mut().register_predicate("(Part = ?)", |row, params| {
            row.get("Part") == params.first()
        });
        let mut cursor = handler.select(&query).unwrap();
        let order_id = Column::new("OrderID", SqlType::Integer);
        assert_eq!(drain(cursor.as_mut(), &order_id), vec![Value::Int(2)]);
    }

    #[test]
    fn test_delete_and_rollback() {
        let db = items_db();
        let mut handler = MemoryDataHandler::new(db.clone());
        let table = items_table();
        let key_cols = table.columns_named(&["OrderID"]);
        let key_vals = [Value::Int(1)];

        handler.start_document(CommitMode::AfterDocument).unwrap();
        let deleted = handler
            .delete(&DeleteQuery {
                table: &table,
                key: Some(KeyFilter { columns: &key_cols, values: &key_vals }),
                where_clause: None,
                param_columns: None,
                param_values: None,
            })
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(db.borrow().row_count("Items"), 1);

        handler.recover_from_exception().unwrap();
        assert_eq!(db.borrow().row_count("Items"), 3);
    }

    #[test]
    fn test_cursor_missing_column() {
        let mut cursor = MemoryCursor::from_rows(&["A"], vec![vec![Value::Int(1)]]);
        let b = Column::new("B", SqlType::Integer);
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.value(&b).unwrap(), None);
        assert!(!cursor.advance().unwrap());
    }
}
