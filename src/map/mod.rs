//! Map Module - Compiled Table/Element Mapping
//!
//! The finished object graph a map compiler would produce:
//! - Tables, columns and keys
//! - Class table maps (arena, addressed by `ClassMapId`)
//! - Links and order information
//! - Namespace prefix table for the document

pub mod class;
pub mod link;
pub mod table;

pub use class::{
    ClassMapId, ClassTableMap, ColumnMap, InlinedElement, PropertyKind, PropertyMap,
    PropertyTableMap, RelatedClassTableMap, XmlName,
};
pub use link::{LinkInfo, OrderInfo, OrderSource};
pub use table::{Column, Key, KeyKind, SqlType, Table, TableName, DEFAULT_DATABASE};

use std::collections::{BTreeMap, HashMap};

use crate::error::{DbmsError, Result};

/// Compiled map
#[derive(Debug, Default, Clone)]
pub struct Map {
    class_maps: Vec<ClassTableMap>,
    by_table: HashMap<TableName, ClassMapId>,
    namespaces: BTreeMap<String, String>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a namespace prefix
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// Add a class table map and return its id
    ///
    /// A table can be mapped as a class table once; adding it again replaces
    /// the lookup entry but keeps the earlier map reachable by id.
    pub fn add_class_table_map(&mut self, class_map: ClassTableMap) -> ClassMapId {
        let id = ClassMapId(self.class_maps.len());
        self.by_table.insert(class_map.table.name.clone(), id);
        self.class_maps.push(class_map);
        id
    }

    /// Attach a related class table to `parent`
    pub fn add_related_class(&mut self, parent: ClassMapId, related: RelatedClassTableMap) {
        if let Some(class_map) = self.class_maps.get_mut(parent.0) {
            class_map.related_classes.push(related);
        }
    }

    /// Class table map for a table, if the table is mapped as a class table
    pub fn class_table_map_for(&self, table: &TableName) -> Option<ClassMapId> {
        self.by_table.get(table).copied()
    }

    /// Like [`class_table_map_for`](Self::class_table_map_for), as a
    /// configuration error when the table is not a class table
    pub fn require_class_table_map(&self, table: &TableName) -> Result<ClassMapId> {
        self.class_table_map_for(table)
            .ok_or_else(|| DbmsError::TableNotMapped(table.to_string()))
    }

    pub fn class_table_map(&self, id: ClassMapId) -> &ClassTableMap {
        &self.class_maps[id.0]
    }

    pub fn class_table_maps(&self) -> impl Iterator<Item = (ClassMapId, &ClassTableMap)> {
        self.class_maps.iter().enumerate().map(|(i, m)| (ClassMapId(i), m))
    }

    /// Namespace prefix → URI table for the whole document
    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }

    /// Namespace URI for a name, None for unprefixed names
    pub fn namespace_uri(&self, name: &XmlName) -> Result<Option<&str>> {
        match &name.prefix {
            None => Ok(None),
            Some(prefix) => self
                .namespaces
                .get(prefix)
                .map(|uri| Some(uri.as_str()))
                .ok_or_else(|| DbmsError::UnknownPrefix(prefix.clone())),
        }
    }
}
