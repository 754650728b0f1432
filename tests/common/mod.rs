//! Shared fixtures for integration tests: an order database with line
//! items, line item details and order notes, held in a `MemoryDatabase`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use xmldbms::{
    Call, ClassTableMap, Column, Cursor, DataHandler, DataHandlers, DatabaseError, DeleteQuery, LinkInfo, Map,
    MemoryDataHandler, MemoryDatabase, OrderInfo, PropertyMap, PropertyTableMap, RelatedClassTableMap,
    RootFilter, SelectQuery, SqlType, Table, TableName, Value, XmlName,
};

pub type Db = Rc<RefCell<MemoryDatabase>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ── Tables ─────────────────────────────────────────────────────────────────

pub fn orders_table() -> Table {
    Table::new(TableName::new("Orders"))
        .with_column("OrderID", SqlType::Integer)
        .with_column("Customer", SqlType::Varchar)
        .with_primary_key(&["OrderID"])
}

pub fn line_items_table() -> Table {
    Table::new(TableName::new("LineItems"))
        .with_column("OrderID", SqlType::Integer)
        .with_column("LineNum", SqlType::Integer)
        .with_column("Item", SqlType::Varchar)
        .with_primary_key(&["OrderID", "LineNum"])
}

pub fn details_table() -> Table {
    Table::new(TableName::new("Details"))
        .with_column("OrderID", SqlType::Integer)
        .with_column("LineNum", SqlType::Integer)
        .with_column("Detail", SqlType::Varchar)
}

pub fn notes_table() -> Table {
    Table::new(TableName::new("Notes"))
        .with_column("OrderID", SqlType::Integer)
        .with_column("Text", SqlType::Varchar)
}

pub fn order_id() -> Vec<Column> {
    vec![Column::new("OrderID", SqlType::Integer)]
}

pub fn line_key() -> Vec<Column> {
    vec![
        Column::new("OrderID", SqlType::Integer),
        Column::new("LineNum", SqlType::Integer),
    ]
}

pub fn line_num_order(ascending: bool) -> OrderInfo {
    OrderInfo::column(Column::new("LineNum", SqlType::Integer), ascending)
}

// ── Maps ───────────────────────────────────────────────────────────────────

/// `Orders` element with no mapped columns
pub fn orders_class() -> ClassTableMap {
    ClassTableMap::new(orders_table(), XmlName::new("Orders"))
}

/// `LineItems` element with an `Item` child element
pub fn line_items_class() -> ClassTableMap {
    ClassTableMap::new(line_items_table(), XmlName::new("LineItems"))
        .with_column("Item", PropertyMap::element(XmlName::new("Item")))
}

/// `Notes` property table of an order
pub fn notes_property(property: PropertyMap) -> PropertyTableMap {
    PropertyTableMap {
        table: notes_table(),
        column: Column::new("Text", SqlType::Varchar),
        property,
        link: LinkInfo::child_holds_key(order_id(), order_id()),
    }
}

/// Orders with line items ordered by `LineNum` and unordered notes
pub fn order_map() -> Map {
    let mut map = Map::new();
    let orders = map.add_class_table_map(
        orders_class().with_property_table(notes_property(PropertyMap::element(XmlName::new("Notes")))),
    );
    let items = map.add_class_table_map(line_items_class());
    map.add_related_class(
        orders,
        RelatedClassTableMap::new(items, LinkInfo::child_holds_key(order_id(), order_id()))
            .with_order(line_num_order(true)),
    );
    map
}

/// Orders → LineItems → Details
///
/// With `child_holds_key` each child table holds the foreign key to its
/// parent; otherwise each parent holds the key of its children.
pub fn chain_map(child_holds_key: bool) -> Map {
    let link = |parent: Vec<Column>, child: Vec<Column>| {
        if child_holds_key {
            LinkInfo::child_holds_key(parent, child)
        } else {
            LinkInfo::parent_holds_key(parent, child)
        }
    };

    let mut map = Map::new();
    let orders = map.add_class_table_map(orders_class());
    let items = map.add_class_table_map(line_items_class());
    let details = map.add_class_table_map(
        ClassTableMap::new(details_table(), XmlName::new("Details"))
            .with_column("Detail", PropertyMap::pcdata()),
    );
    map.add_related_class(orders, RelatedClassTableMap::new(items, link(order_id(), order_id())));
    map.add_related_class(items, RelatedClassTableMap::new(details, link(line_key(), line_key())));
    map
}

// ── Data ───────────────────────────────────────────────────────────────────

/// Two orders; order 1 has lines 2 and 1 (in that storage order), a detail
/// per line and a note; order 2 has one line
pub fn seed_orders() -> Db {
    let db = MemoryDatabase::shared();
    {
        let mut db = db.borrow_mut();
        db.create_table("Orders", &["OrderID", "Customer"])
            .push(vec![1.into(), "ACME".into()])
            .push(vec![2.into(), "Bolt Co".into()]);
        db.create_table("LineItems", &["OrderID", "LineNum", "Item"])
            .push(vec![1.into(), 2.into(), "B".into()])
            .push(vec![1.into(), 1.into(), "A".into()])
            .push(vec![2.into(), 1.into(), "C".into()]);
        db.create_table("Details", &["OrderID", "LineNum", "Detail"])
            .push(vec![1.into(), 1.into(), "a1".into()])
            .push(vec![1.into(), 2.into(), "b1".into()])
            .push(vec![2.into(), 1.into(), "c1".into()]);
        db.create_table("Notes", &["OrderID", "Text"])
            .push(vec![1.into(), "hi".into()]);
        db.register_predicate("(OrderID = ?)", |row, params| {
            row.get("OrderID") == params.first()
        });
    }
    db
}

/// Root filter selecting one order by `$id`
pub fn order_filter() -> RootFilter {
    RootFilter::new(orders_table()).with_condition("OrderID = $id")
}

pub fn handlers(db: &Db) -> DataHandlers {
    DataHandlers::single(MemoryDataHandler::new(Rc::clone(db)))
}

/// Handlers that ignore the requested ordering, so rows arrive in
/// storage order and placement is left to the shadow tree
pub fn unsorted_handlers(db: &Db) -> DataHandlers {
    DataHandlers::single(Unsorted(MemoryDataHandler::new(Rc::clone(db))))
}

pub struct Unsorted(pub MemoryDataHandler);

impl DataHandler for Unsorted {
    fn select(&mut self, query: &SelectQuery<'_>) -> Result<Box<dyn Cursor>, DatabaseError> {
        let unordered = SelectQuery { order: None, ..*query };
        self.0.select(&unordered)
    }

    fn delete(&mut self, query: &DeleteQuery<'_>) -> Result<u64, DatabaseError> {
        self.0.delete(query)
    }
}

/// Calls as `"select Orders"`, `"delete LineItems"`, `"start"`, ...
pub fn call_log(db: &Db) -> Vec<String> {
    db.borrow()
        .calls()
        .iter()
        .map(|call| match call {
            Call::StartDocument(_) => "start".to_string(),
            Call::Select { table, .. } => format!("select {}", table),
            Call::Delete { table, .. } => format!("delete {}", table),
            Call::EndDocument => "end".to_string(),
            Call::Recover => "recover".to_string(),
        })
        .collect()
}

pub fn ids(values: &[i64]) -> Vec<Value> {
    values.iter().map(|v| Value::Int(*v)).collect()
}
