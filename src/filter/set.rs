//! Filter Sets
//!
//! A filter set selects the root rows of a document and restricts the rows
//! of tables further down. Each entry is either a root filter (a query on a
//! class table) or a result-set filter (rows supplied by the caller).

use std::collections::HashMap;

use crate::error::Result;
use crate::filter::conditions::FilterConditions;
use crate::filter::params::Parameters;
use crate::map::{Table, TableName, XmlName};

/// Rows selected by conditions on a class table
#[derive(Debug)]
pub struct RootFilter {
    pub conditions: FilterConditions,
    table_filters: HashMap<TableName, FilterConditions>,
}

impl RootFilter {
    /// Filter on `table` with no conditions yet
    pub fn new(table: Table) -> Self {
        RootFilter {
            conditions: FilterConditions::new(table),
            table_filters: HashMap::new(),
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.add_condition(condition);
        self
    }

    /// Restrict rows of a table below the root
    pub fn with_table_filter(mut self, filter: FilterConditions) -> Self {
        self.table_filters.insert(filter.table().name.clone(), filter);
        self
    }

    pub fn table(&self) -> &TableName {
        &self.conditions.table().name
    }
}

/// Root rows taken from a result set the caller supplies by name
#[derive(Debug)]
pub struct ResultSetFilter {
    pub name: String,
    pub table: TableName,
    table_filters: HashMap<TableName, FilterConditions>,
}

impl ResultSetFilter {
    pub fn new(name: impl Into<String>, table: TableName) -> Self {
        ResultSetFilter {
            name: name.into(),
            table,
            table_filters: HashMap::new(),
        }
    }

    pub fn with_table_filter(mut self, filter: FilterConditions) -> Self {
        self.table_filters.insert(filter.table().name.clone(), filter);
        self
    }
}

/// Source of root rows
#[derive(Debug)]
pub enum FilterBase {
    Root(RootFilter),
    ResultSet(ResultSetFilter),
}

impl FilterBase {
    /// Class table of the root rows
    pub fn table(&self) -> &TableName {
        match self {
            FilterBase::Root(f) => f.table(),
            FilterBase::ResultSet(f) => &f.table,
        }
    }

    /// Conditions restricting rows of `table` below the root
    pub fn table_filter_mut(&mut self, table: &TableName) -> Option<&mut FilterConditions> {
        match self {
            FilterBase::Root(f) => f.table_filters.get_mut(table),
            FilterBase::ResultSet(f) => f.table_filters.get_mut(table),
        }
    }

    pub fn set_parameters(&mut self, parameters: &Parameters) {
        let table_filters = match self {
            FilterBase::Root(f) => {
                f.conditions.set_parameters(parameters);
                &mut f.table_filters
            }
            FilterBase::ResultSet(f) => &mut f.table_filters,
        };
        for filter in table_filters.values_mut() {
            filter.set_parameters(parameters);
        }
    }

    /// Derive every WHERE fragment now, so parameter errors surface before
    /// any statement is issued
    pub fn validate(&mut self) -> Result<()> {
        let table_filters = match self {
            FilterBase::Root(f) => {
                f.conditions.resolve()?;
                &mut f.table_filters
            }
            FilterBase::ResultSet(f) => &mut f.table_filters,
        };
        for filter in table_filters.values_mut() {
            filter.resolve()?;
        }
        Ok(())
    }
}

impl From<RootFilter> for FilterBase {
    fn from(f: RootFilter) -> Self {
        FilterBase::Root(f)
    }
}

impl From<ResultSetFilter> for FilterBase {
    fn from(f: ResultSetFilter) -> Self {
        FilterBase::ResultSet(f)
    }
}

/// Ordered list of filters, plus wrapper elements around all root rows
#[derive(Debug, Default)]
pub struct FilterSet {
    wrappers: Vec<XmlName>,
    filters: Vec<FilterBase>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a wrapper element, nested inside the previous one
    pub fn with_wrapper(mut self, name: XmlName) -> Self {
        self.wrappers.push(name);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<FilterBase>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn wrappers(&self) -> &[XmlName] {
        &self.wrappers
    }

    pub fn filters(&self) -> &[FilterBase] {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut [FilterBase] {
        &mut self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Bind parameters on every filter and table filter
    pub fn set_parameters(&mut self, parameters: &Parameters) {
        for filter in &mut self.filters {
            filter.set_parameters(parameters);
        }
    }

    /// Validate every filter, stopping at the first parameter error
    pub fn validate(&mut self) -> Result<()> {
        self.filters.iter_mut().try_for_each(FilterBase::validate)
    }
}
