//! Link and Order Metadata
//!
//! `LinkInfo` says how a parent table row finds its child rows; `OrderInfo`
//! says where the resulting node goes among its siblings.

use crate::error::Result;
use crate::map::table::Column;
use crate::ordered::UNORDERED;
use crate::row::Row;
use crate::value::Value;

/// Foreign-key link between a parent table and a child table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    /// True when the parent-side key is a unique/candidate key, i.e. the
    /// child table holds the foreign key
    pub parent_key_is_unique: bool,
    /// Key columns in the parent table, in key order
    pub parent_key: Vec<Column>,
    /// Matching key columns in the child table, same order
    pub child_key: Vec<Column>,
}

impl LinkInfo {
    /// Child table holds a foreign key referencing the parent's candidate key
    pub fn child_holds_key(parent_key: Vec<Column>, child_key: Vec<Column>) -> Self {
        LinkInfo {
            parent_key_is_unique: true,
            parent_key,
            child_key,
        }
    }

    /// Parent table holds a foreign key referencing the child's candidate key
    pub fn parent_holds_key(parent_key: Vec<Column>, child_key: Vec<Column>) -> Self {
        LinkInfo {
            parent_key_is_unique: false,
            parent_key,
            child_key,
        }
    }

    /// Child rows must be deleted before the parent row
    #[inline]
    pub fn child_deleted_first(&self) -> bool {
        self.parent_key_is_unique
    }
}

/// Where an order value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderSource {
    /// Value of a column in the row that produces the node
    Column(Column),
    /// The same value for every node
    Fixed(i64),
}

/// Sibling order for a mapped node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderInfo {
    pub source: OrderSource,
    pub ascending: bool,
}

impl OrderInfo {
    pub fn column(column: Column, ascending: bool) -> Self {
        OrderInfo {
            source: OrderSource::Column(column),
            ascending,
        }
    }

    pub fn fixed(value: i64) -> Self {
        OrderInfo {
            source: OrderSource::Fixed(value),
            ascending: true,
        }
    }

    /// Column a query should sort by, if any
    pub fn order_column(&self) -> Option<&Column> {
        match &self.source {
            OrderSource::Column(c) => Some(c),
            OrderSource::Fixed(_) => None,
        }
    }

    /// Order value for a node produced from `row`
    ///
    /// A NULL or absent order column yields [`UNORDERED`].
    pub fn order_value(&self, row: &Row) -> Result<i64> {
        match &self.source {
            OrderSource::Fixed(v) => Value::Int(*v).to_order_value(),
            OrderSource::Column(c) => match row.get(c) {
                Some(v) => v.to_order_value(),
                None => Ok(UNORDERED),
            },
        }
    }
}

/// Order value and direction for an optional `OrderInfo`
pub fn resolve_order(order: Option<&OrderInfo>, row: &Row) -> Result<(i64, bool)> {
    match order {
        Some(info) => Ok((info.order_value(row)?, info.ascending)),
        None => Ok((UNORDERED, true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::table::SqlType;

    #[test]
    fn test_order_value_from_row() {
        let line = Column::new("LineNum", SqlType::Integer);
        let info = OrderInfo::column(line.clone(), false);

        let mut row = Row::new();
        row.set(&line, Value::Int(3));
        assert_eq!(info.order_value(&row).unwrap(), 3);
        assert_eq!(resolve_order(Some(&info), &row).unwrap(), (3, false));

        row.set(&line, Value::Null);
        assert_eq!(info.order_value(&row).unwrap(), UNORDERED);
    }

    #[test]
    fn test_fixed_and_missing_order() {
        let row = Row::new();
        assert_eq!(OrderInfo::fixed(10).order_value(&row).unwrap(), 10);
        assert_eq!(resolve_order(None, &row).unwrap(), (UNORDERED, true));
        assert!(OrderInfo::fixed(UNORDERED).order_value(&row).is_err());
    }

    #[test]
    fn test_link_direction() {
        let id = Column::new("OrderID", SqlType::Integer);
        assert!(LinkInfo::child_holds_key(vec![id.clone()], vec![id.clone()]).child_deleted_first());
        assert!(!LinkInfo::parent_holds_key(vec![id.clone()], vec![id]).child_deleted_first());
    }
}
