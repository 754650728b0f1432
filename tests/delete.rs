//! Deletion walk against the in-memory database.

mod common;

use std::rc::Rc;

use common::*;
use xmldbms::{
    Action, Actions, Call, ClassTableMap, CommitMode, DataHandlers, DatabaseError, DbmsDeleter, DbmsError,
    DeleteReport, FilterConditions, FilterSet, LinkInfo, Map, MemoryDataHandler, MemoryDatabase, ParamValue,
    Parameters, PropertyMap, ResultSetFilter, RootFilter, TableName, XmlName,
};

fn delete(
    db: &Db,
    map: &Map,
    filters: &mut FilterSet,
    parameters: &Parameters,
    actions: &Actions,
) -> xmldbms::Result<DeleteReport> {
    init_logging();
    DbmsDeleter::new(handlers(db)).delete_document(map, filters, parameters, actions)
}

fn delete_order(db: &Db, map: &Map, id: i64, actions: &Actions) -> xmldbms::Result<DeleteReport> {
    let mut filters = FilterSet::new().with_filter(order_filter());
    delete(db, map, &mut filters, &Parameters::new().with("id", id), actions)
}

/// Tables and keys of the DELETE calls, in order
fn deletes(db: &Db) -> Vec<(String, Vec<xmldbms::Value>)> {
    db.borrow()
        .calls()
        .iter()
        .filter_map(|call| match call {
            Call::Delete { table, key, .. } => Some((table.clone(), key.clone())),
            _ => None,
        })
        .collect()
}

// ── Statement order ────────────────────────────────────────────────────────

#[test]
fn test_children_holding_key_deleted_first() {
    let db = seed_orders();

    let report = delete_order(&db, &chain_map(true), 1, &Actions::all(Action::Delete)).unwrap();

    assert_eq!(
        deletes(&db),
        vec![
            ("Details".to_string(), ids(&[1, 2])),
            ("Details".to_string(), ids(&[1, 1])),
            ("LineItems".to_string(), ids(&[1, 2])),
            ("LineItems".to_string(), ids(&[1, 1])),
            ("Orders".to_string(), ids(&[1])),
        ]
    );
    assert_eq!(
        call_log(&db),
        vec![
            "start",
            "select Orders",
            "select LineItems",
            "delete Details",
            "delete Details",
            "delete LineItems",
            "delete LineItems",
            "delete Orders",
            "end",
        ]
    );
    assert_eq!(report.statements, 5);
    assert_eq!(report.rows_affected, 5);
    assert!(!report.has_warnings());

    let db = db.borrow();
    assert_eq!(db.row_count("Orders"), 1);
    assert_eq!(db.row_count("LineItems"), 1);
    assert_eq!(db.row_count("Details"), 1);
}

#[test]
fn test_parent_holding_key_deleted_first() {
    let db = seed_orders();

    delete_order(&db, &chain_map(false), 1, &Actions::all(Action::Delete)).unwrap();

    assert_eq!(
        deletes(&db),
        vec![
            ("Orders".to_string(), ids(&[1])),
            ("LineItems".to_string(), ids(&[1, 2])),
            ("Details".to_string(), ids(&[1, 2])),
            ("LineItems".to_string(), ids(&[1, 1])),
            ("Details".to_string(), ids(&[1, 1])),
        ]
    );
    assert_eq!(db.borrow().row_count("Details"), 1);
}

#[test]
fn test_property_table_and_leaf_class() {
    let db = seed_orders();

    let report = delete_order(&db, &order_map(), 1, &Actions::all(Action::Delete)).unwrap();

    // LineItems is a leaf, so its rows go by the link key without a SELECT
    assert_eq!(
        call_log(&db),
        vec!["start", "select Orders", "delete Notes", "delete LineItems", "delete Orders", "end"]
    );
    assert_eq!(
        deletes(&db),
        vec![
            ("Notes".to_string(), ids(&[1])),
            ("LineItems".to_string(), ids(&[1])),
            ("Orders".to_string(), ids(&[1])),
        ]
    );
    assert_eq!(report.rows_affected, 4);
    assert_eq!(db.borrow().row_count("Notes"), 0);
}

#[test]
fn test_root_without_primary_key() {
    let db = seed_orders();
    let mut map = Map::new();
    map.add_class_table_map(
        ClassTableMap::new(details_table(), XmlName::new("Details")).with_column("Detail", PropertyMap::pcdata()),
    );
    let mut filters = FilterSet::new().with_filter(RootFilter::new(details_table()).with_condition("OrderID = $id"));

    let report = delete(
        &db,
        &map,
        &mut filters,
        &Parameters::new().with("id", 1i64),
        &Actions::all(Action::Delete),
    )
    .unwrap();

    assert_eq!(call_log(&db), vec!["start", "select Details", "delete Details", "end"]);
    assert!(matches!(
        &db.borrow().calls()[2],
        Call::Delete { key, where_clause: Some(w), params, rows: 2, .. }
            if key.is_empty() && w == "(OrderID = ?)" && *params == ids(&[1])
    ));
    assert_eq!(report.rows_affected, 2);
    assert_eq!(db.borrow().row_count("Details"), 1);
}

#[test]
fn test_table_filter_restricts_deletes() {
    let db = seed_orders();
    db.borrow_mut().register_predicate("(LineNum IN (?))", |row, params| {
        row.get("LineNum").map(|v| params.contains(v)).unwrap_or(false)
    });
    let filter = order_filter()
        .with_table_filter(FilterConditions::new(line_items_table()).with_condition("LineNum IN ($lines)"));
    let mut filters = FilterSet::new().with_filter(filter);
    let parameters = Parameters::new()
        .with("id", 1i64)
        .with("lines", ParamValue::list([2i64]));

    delete(&db, &order_map(), &mut filters, &parameters, &Actions::all(Action::Delete)).unwrap();

    let db = db.borrow();
    let remaining: Vec<_> = db
        .table("LineItems")
        .unwrap()
        .rows()
        .iter()
        .map(|r| r[2].clone())
        .collect();
    assert_eq!(remaining, vec![xmldbms::Value::from("A"), xmldbms::Value::from("C")]);
}

// ── Actions ────────────────────────────────────────────────────────────────

#[test]
fn test_action_none_keeps_rows() {
    let db = seed_orders();
    let actions = Actions::all(Action::Delete).with_action(&XmlName::new("LineItems"), Action::None);

    delete_order(&db, &order_map(), 1, &actions).unwrap();

    assert_eq!(
        call_log(&db),
        vec!["start", "select Orders", "delete Notes", "delete Orders", "end"]
    );
    assert_eq!(db.borrow().row_count("LineItems"), 3);
}

#[test]
fn test_action_none_still_visits_descendants() {
    let db = seed_orders();
    let actions = Actions::all(Action::Delete).with_action(&XmlName::new("LineItems"), Action::None);

    delete_order(&db, &chain_map(true), 1, &actions).unwrap();

    assert_eq!(
        deletes(&db),
        vec![
            ("Details".to_string(), ids(&[1, 2])),
            ("Details".to_string(), ids(&[1, 1])),
            ("Orders".to_string(), ids(&[1])),
        ]
    );
}

#[test]
fn test_soft_delete_tolerates_constraint_violation() {
    let db = seed_orders();
    db.borrow_mut()
        .fail_deletes("Orders", DatabaseError::constraint_violation("FK_Invoices_Orders"));

    let report = delete_order(&db, &order_map(), 1, &Actions::all(Action::SoftDelete)).unwrap();

    assert!(report.has_warnings());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("Orders"));
    assert!(report.warnings[0].contains("FK_Invoices_Orders"));
    assert_eq!(call_log(&db).last().map(String::as_str), Some("end"));

    let db = db.borrow();
    assert_eq!(db.row_count("Orders"), 2);
    assert_eq!(db.row_count("LineItems"), 1);
}

#[test]
fn test_soft_delete_fails_on_other_errors() {
    let db = seed_orders();
    db.borrow_mut()
        .fail_deletes("Orders", DatabaseError::statement("connection lost"));

    let err = delete_order(&db, &order_map(), 1, &Actions::all(Action::SoftDelete)).unwrap_err();
    assert!(matches!(err, DbmsError::Database(_)));
    assert_eq!(call_log(&db).last().map(String::as_str), Some("recover"));
}

#[test]
fn test_delete_failure_recovers() {
    let db = seed_orders();
    db.borrow_mut()
        .fail_deletes("Orders", DatabaseError::constraint_violation("FK_Invoices_Orders"));

    let err = delete_order(&db, &order_map(), 1, &Actions::all(Action::Delete)).unwrap_err();

    assert!(matches!(err, DbmsError::Database(ref e) if e.is_constraint_violation()));
    let log = call_log(&db);
    assert_eq!(log.last().map(String::as_str), Some("recover"));
    assert!(!log.contains(&"end".to_string()));

    // Nothing was committed, so the handler restored every row
    let db = db.borrow();
    assert_eq!(db.row_count("Notes"), 1);
    assert_eq!(db.row_count("LineItems"), 3);
}

#[test]
fn test_commit_per_statement_keeps_earlier_deletes() {
    let db = seed_orders();
    db.borrow_mut()
        .fail_deletes("Orders", DatabaseError::constraint_violation("FK_Invoices_Orders"));
    let mut filters = FilterSet::new().with_filter(order_filter());
    let mut deleter = DbmsDeleter::new(handlers(&db)).with_commit_mode(CommitMode::AfterStatement);

    deleter
        .delete_document(
            &order_map(),
            &mut filters,
            &Parameters::new().with("id", 1i64),
            &Actions::all(Action::Delete),
        )
        .unwrap_err();

    let db = db.borrow();
    assert_eq!(db.calls()[0], Call::StartDocument(CommitMode::AfterStatement));
    assert_eq!(db.row_count("LineItems"), 1);
}

#[test]
fn test_missing_action() {
    let db = seed_orders();
    let actions = Actions::new().with_action(&XmlName::new("LineItems"), Action::Delete);

    let err = delete_order(&db, &order_map(), 1, &actions).unwrap_err();

    assert!(matches!(err, DbmsError::NoAction(ref e) if e == "Orders"));
    assert_eq!(call_log(&db), vec!["start", "recover"]);
}

// ── Filters and handlers ───────────────────────────────────────────────────

#[test]
fn test_result_set_filter_rejected() {
    let db = seed_orders();
    let mut filters = FilterSet::new().with_filter(ResultSetFilter::new("picked", TableName::new("Orders")));

    let err = delete(
        &db,
        &order_map(),
        &mut filters,
        &Parameters::new(),
        &Actions::all(Action::Delete),
    )
    .unwrap_err();

    assert!(matches!(err, DbmsError::UnsupportedFilter(_)));
    assert!(db.borrow().calls().is_empty());
}

#[test]
fn test_missing_parameter_rejected_before_start() {
    let db = seed_orders();
    let mut filters = FilterSet::new().with_filter(order_filter());

    let err = delete(
        &db,
        &order_map(),
        &mut filters,
        &Parameters::new(),
        &Actions::all(Action::Delete),
    )
    .unwrap_err();

    assert!(matches!(err, DbmsError::MissingParameter(_)));
    assert!(call_log(&db).is_empty());
}

#[test]
fn test_later_filter_parameter_error_deletes_nothing() {
    let db = seed_orders();
    let mut filters = FilterSet::new()
        .with_filter(order_filter())
        .with_filter(RootFilter::new(orders_table()).with_condition("OrderID = $missing"));
    let mut deleter = DbmsDeleter::new(handlers(&db)).with_commit_mode(CommitMode::AfterStatement);

    let err = deleter
        .delete_document(
            &order_map(),
            &mut filters,
            &Parameters::new().with("id", 1i64),
            &Actions::all(Action::Delete),
        )
        .unwrap_err();

    assert!(matches!(err, DbmsError::MissingParameter(ref n) if n == "$missing"));
    assert!(deletes(&db).is_empty());
    assert!(call_log(&db).is_empty());
    assert_eq!(db.borrow().row_count("Orders"), 2);
    assert_eq!(db.borrow().row_count("LineItems"), 3);
}

#[test]
fn test_every_database_handler_notified() {
    let db = seed_orders();
    let archive = MemoryDatabase::shared();
    archive
        .borrow_mut()
        .create_table("Archive.Notes", &["OrderID", "Text"])
        .push(vec![1.into(), "archived".into()]);

    let archived_notes = xmldbms::PropertyTableMap {
        table: xmldbms::Table::new(TableName::new("Notes").with_database("Archive"))
            .with_column("OrderID", xmldbms::SqlType::Integer)
            .with_column("Text", xmldbms::SqlType::Varchar),
        column: xmldbms::Column::new("Text", xmldbms::SqlType::Varchar),
        property: PropertyMap::element(XmlName::new("Note")),
        link: LinkInfo::child_holds_key(order_id(), order_id()),
    };
    let mut map = Map::new();
    map.add_class_table_map(orders_class().with_property_table(archived_notes));

    let mut handlers = DataHandlers::single(MemoryDataHandler::new(Rc::clone(&db)));
    handlers.register("Archive", MemoryDataHandler::new(Rc::clone(&archive)));
    let mut filters = FilterSet::new().with_filter(order_filter());
    let mut deleter = DbmsDeleter::new(handlers);

    deleter
        .delete_document(
            &map,
            &mut filters,
            &Parameters::new().with("id", 1i64),
            &Actions::all(Action::Delete),
        )
        .unwrap();

    assert_eq!(archive.borrow().row_count("Archive.Notes"), 0);
    assert_eq!(call_log(&archive), vec!["start", "delete Archive.Notes", "end"]);
    assert_eq!(call_log(&db), vec!["start", "select Orders", "delete Orders", "end"]);
}
