//! Row Cache
//!
//! Holds the column values of the current cursor row. One `Row` is created
//! per table walk and refilled on every cursor advance.

use std::collections::HashMap;

use crate::handler::Cursor;
use crate::map::Column;
use crate::error::Result;
use crate::value::Value;

/// Column values of one result row, keyed by column name
#[derive(Debug, Default, Clone)]
pub struct Row {
    values: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Row {
            values: HashMap::with_capacity(16),
        }
    }

    /// Drop all cached values, keeping the allocation
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Refill from the cursor's current row
    ///
    /// Columns the cursor does not carry stay absent.
    pub fn load(&mut self, cursor: &dyn Cursor, columns: &[Column]) -> Result<()> {
        self.values.clear();
        for column in columns {
            if let Some(value) = cursor.value(column)? {
                self.values.insert(column.name.clone(), value);
            }
        }
        Ok(())
    }

    pub fn set(&mut self, column: &Column, value: Value) {
        self.values.insert(column.name.clone(), value);
    }

    pub fn get(&self, column: &Column) -> Option<&Value> {
        self.values.get(&column.name)
    }

    pub fn contains(&self, column: &Column) -> bool {
        self.values.contains_key(&column.name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values of `columns`, in order, for a key lookup
    ///
    /// Returns None when any value is NULL or absent: no row can match.
    pub fn key_values(&self, columns: &[Column]) -> Option<Vec<Value>> {
        columns
            .iter()
            .map(|c| match self.get(c) {
                Some(v) if !v.is_null() => Some(v.clone()),
                _ => None,
            })
            .collect()
    }
}
