//! Deletion Walk
//!
//! Deletes the rows a document was built from. The walk visits the same
//! table graph as retrieval, but the order of the DELETE statements follows
//! the foreign keys:
//! - child holds the key: child rows go before the parent row
//! - parent holds the key: child rows go right after the parent row
//!
//! Every registered data handler is told when the document starts and
//! ends; on failure each one is asked to recover before the error is
//! returned.

use crate::error::{DbmsError, Result};
use crate::filter::{FilterBase, FilterSet, Parameters};
use crate::handler::{CommitMode, Cursor, DataHandlers, DeleteQuery, KeyFilter, SelectQuery};
use crate::map::{ClassTableMap, Column, Map, RelatedClassTableMap, Table};
use crate::row::Row;
use crate::transfer::actions::{Action, Actions};
use crate::value::Value;

/// Outcome of a deletion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Constraint violations tolerated by soft deletes
    pub warnings: Vec<String>,
    /// Rows reported deleted by the handlers
    pub rows_affected: u64,
    /// DELETE statements issued
    pub statements: usize,
}

impl DeleteReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Deletes the rows selected by root filters
#[derive(Debug)]
pub struct DbmsDeleter {
    handlers: DataHandlers,
    commit_mode: CommitMode,
}

impl DbmsDeleter {
    pub fn new(handlers: DataHandlers) -> Self {
        DbmsDeleter {
            handlers,
            commit_mode: CommitMode::AfterDocument,
        }
    }

    pub fn with_commit_mode(mut self, commit_mode: CommitMode) -> Self {
        self.commit_mode = commit_mode;
        self
    }

    pub fn handlers_mut(&mut self) -> &mut DataHandlers {
        &mut self.handlers
    }

    pub fn into_handlers(self) -> DataHandlers {
        self.handlers
    }

    /// Delete the rows selected by `filters` and everything mapped below them
    pub fn delete_document(
        &mut self,
        map: &Map,
        filters: &mut FilterSet,
        parameters: &Parameters,
        actions: &Actions,
    ) -> Result<DeleteReport> {
        if let Some(FilterBase::ResultSet(result_set)) =
            filters.filters().iter().find(|f| matches!(f, FilterBase::ResultSet(_)))
        {
            return Err(DbmsError::UnsupportedFilter(format!(
                "result set {} cannot drive a deletion",
                result_set.name
            )));
        }
        filters.set_parameters(parameters);
        filters.validate()?;

        match self.run(map, filters, actions) {
            Ok(report) => {
                log::debug!(
                    "deleted {} rows with {} statements, {} warnings",
                    report.rows_affected,
                    report.statements,
                    report.warnings.len()
                );
                Ok(report)
            }
            Err(e) => {
                log::debug!("deletion failed, recovering: {}", e);
                self.recover();
                Err(e)
            }
        }
    }

    fn run(&mut self, map: &Map, filters: &mut FilterSet, actions: &Actions) -> Result<DeleteReport> {
        for (_, handler) in self.handlers.iter_mut() {
            handler.start_document(self.commit_mode)?;
        }

        let mut report = DeleteReport::default();
        for filter in filters.filters_mut() {
            let mut ctx = DeletionContext {
                map,
                filter,
                handlers: &mut self.handlers,
                actions,
                report: &mut report,
            };
            ctx.delete_root()?;
        }

        for (_, handler) in self.handlers.iter_mut() {
            handler.end_document()?;
        }
        Ok(report)
    }

    fn recover(&mut self) {
        for (database, handler) in self.handlers.iter_mut() {
            if let Err(e) = handler.recover_from_exception() {
                log::error!("recovery failed for database {}: {}", database, e);
            }
        }
    }
}

/// A DELETE by key, waiting for its turn
#[derive(Debug)]
struct PendingDelete<'m> {
    table: &'m Table,
    key_columns: &'m [Column],
    key_values: Vec<Value>,
    action: Action,
    /// Restrict with the table's filter conditions as well
    filtered: bool,
}

/// State of one deletion, threaded through the recursion
struct DeletionContext<'a> {
    map: &'a Map,
    filter: &'a mut FilterBase,
    handlers: &'a mut DataHandlers,
    actions: &'a Actions,
    report: &'a mut DeleteReport,
}

impl<'a> DeletionContext<'a> {
    fn delete_root(&mut self) -> Result<()> {
        let class_id = self.map.require_class_table_map(self.filter.table())?;
        let class_map = self.map.class_table_map(class_id);
        let action = self.actions.action_for(&class_map.element_type)?;
        let table = &class_map.table;

        let mut cursor = match &mut *self.filter {
            FilterBase::Root(root) => {
                let conditions = root.conditions.resolve()?;
                let query = SelectQuery {
                    where_clause: conditions.where_clause,
                    param_columns: conditions.columns,
                    param_values: conditions.values,
                    ..SelectQuery::table(table)
                };
                log::debug!("SELECT root {} where {:?}", table.name, query.where_clause);
                self.handlers.for_table(&table.name)?.select(&query)?
            }
            FilterBase::ResultSet(result_set) => {
                return Err(DbmsError::UnsupportedFilter(format!(
                    "result set {} cannot drive a deletion",
                    result_set.name
                )))
            }
        };

        let by_primary_key = table.primary_key().is_some();
        let mut trailing = Vec::new();
        let mut row = Row::new();
        while cursor.advance()? {
            row.load(cursor.as_ref(), table.columns())?;
            let sequence = self.visit_class_row(class_map, &row, action)?;
            if by_primary_key {
                self.execute_all(&sequence)?;
            } else {
                trailing.extend(sequence);
            }
        }
        drop(cursor);

        if !by_primary_key {
            self.delete_root_rows(table, action)?;
        }
        self.execute_all(&trailing)
    }

    /// Delete root rows by the root filter's conditions
    fn delete_root_rows(&mut self, table: &Table, action: Action) -> Result<()> {
        if action == Action::None {
            log::debug!("action None, rows of {} kept", table.name);
            return Ok(());
        }
        let FilterBase::Root(root) = &mut *self.filter else {
            return Ok(());
        };
        let conditions = root.conditions.resolve()?;
        let query = DeleteQuery {
            table,
            key: None,
            where_clause: conditions.where_clause,
            param_columns: conditions.columns,
            param_values: conditions.values,
        };
        issue(self.handlers, self.report, &query, action)
    }

    /// Delete everything below a class row that must go before it, and
    /// return the statements that must run once it is its turn: the row
    /// itself (when its table has a primary key) followed by the rows that
    /// must go after it
    fn visit_class_row(
        &mut self,
        class_map: &'a ClassTableMap,
        row: &Row,
        action: Action,
    ) -> Result<Vec<PendingDelete<'a>>> {
        let mut after = Vec::new();

        for property_table in &class_map.property_tables {
            let Some(key_values) = row.key_values(&property_table.link.parent_key) else {
                continue;
            };
            let pending = PendingDelete {
                table: &property_table.table,
                key_columns: &property_table.link.child_key,
                key_values,
                action,
                filtered: true,
            };
            if property_table.link.child_deleted_first() {
                self.execute(&pending)?;
            } else {
                after.push(pending);
            }
        }

        for related in &class_map.related_classes {
            let sequence = self.visit_related_class(related, row)?;
            if related.link.child_deleted_first() {
                self.execute_all(&sequence)?;
            } else {
                after.extend(sequence);
            }
        }

        let mut sequence = Vec::with_capacity(after.len() + 1);
        if let Some(primary_key) = class_map.table.primary_key() {
            match row.key_values(&primary_key.columns) {
                Some(key_values) => sequence.push(PendingDelete {
                    table: &class_map.table,
                    key_columns: &primary_key.columns,
                    key_values,
                    action,
                    filtered: false,
                }),
                None => log::warn!("row of {} has a NULL primary key, not deleted", class_map.table.name),
            }
        }
        sequence.extend(after);
        Ok(sequence)
    }

    /// Statements deleting the rows of a related class table below `row`,
    /// in the order they must run
    fn visit_related_class(&mut self, related: &'a RelatedClassTableMap, row: &Row) -> Result<Vec<PendingDelete<'a>>> {
        let child_map = self.map.class_table_map(related.class_map);
        let action = self.actions.action_for(&child_map.element_type)?;
        let Some(key_values) = row.key_values(&related.link.parent_key) else {
            return Ok(Vec::new());
        };
        let by_link = PendingDelete {
            table: &child_map.table,
            key_columns: &related.link.child_key,
            key_values,
            action,
            filtered: true,
        };

        // Nothing hangs off a leaf, so its rows need not be enumerated
        if child_map.is_leaf() {
            return Ok(vec![by_link]);
        }

        let mut cursor = self.select(&child_map.table, &by_link)?;
        let by_primary_key = child_map.table.primary_key().is_some();
        let mut sequence = Vec::new();
        let mut trailing = Vec::new();
        let mut child_row = Row::new();
        while cursor.advance()? {
            child_row.load(cursor.as_ref(), child_map.table.columns())?;
            let rows = self.visit_class_row(child_map, &child_row, action)?;
            if by_primary_key {
                sequence.extend(rows);
            } else {
                trailing.extend(rows);
            }
        }
        drop(cursor);

        if !by_primary_key {
            sequence.push(by_link);
        }
        sequence.extend(trailing);
        Ok(sequence)
    }

    fn select(&mut self, table: &Table, by_link: &PendingDelete<'_>) -> Result<Box<dyn Cursor>> {
        let conditions = match self.filter.table_filter_mut(&table.name) {
            Some(filter) => Some(filter.resolve()?),
            None => None,
        };
        let query = SelectQuery {
            table,
            key: Some(KeyFilter {
                columns: by_link.key_columns,
                values: &by_link.key_values,
            }),
            where_clause: conditions.and_then(|c| c.where_clause),
            param_columns: conditions.and_then(|c| c.columns),
            param_values: conditions.and_then(|c| c.values),
            order: None,
        };
        log::debug!("SELECT {} key {:?} where {:?}", table.name, by_link.key_values, query.where_clause);
        Ok(self.handlers.for_table(&table.name)?.select(&query)?)
    }

    fn execute_all(&mut self, pending: &[PendingDelete<'_>]) -> Result<()> {
        pending.iter().try_for_each(|p| self.execute(p))
    }

    fn execute(&mut self, pending: &PendingDelete<'_>) -> Result<()> {
        if pending.action == Action::None {
            log::debug!("action None, rows of {} kept", pending.table.name);
            return Ok(());
        }
        let conditions = match self.filter.table_filter_mut(&pending.table.name) {
            Some(filter) if pending.filtered => Some(filter.resolve()?),
            _ => None,
        };
        let query = DeleteQuery {
            table: pending.table,
            key: Some(KeyFilter {
                columns: pending.key_columns,
                values: &pending.key_values,
            }),
            where_clause: conditions.and_then(|c| c.where_clause),
            param_columns: conditions.and_then(|c| c.columns),
            param_values: conditions.and_then(|c| c.values),
        };
        issue(self.handlers, self.report, &query, pending.action)
    }
}

/// Send one DELETE, tolerating constraint violations for soft deletes
fn issue(handlers: &mut DataHandlers, report: &mut DeleteReport, query: &DeleteQuery<'_>, action: Action) -> Result<()> {
    log::debug!(
        "DELETE {} key {:?} where {:?}",
        query.table.name,
        query.key.map(|k| k.values),
        query.where_clause
    );
    report.statements += 1;
    match handlers.for_table(&query.table.name)?.delete(query) {
        Ok(rows) => {
            report.rows_affected += rows;
            Ok(())
        }
        Err(e) if action == Action::SoftDelete && e.is_constraint_violation() => {
            let warning = format!("soft delete on {} skipped: {}", query.table.name, e.message);
            log::warn!("{}", warning);
            report.warnings.push(warning);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
