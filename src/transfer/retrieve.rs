//! Retrieval Walk
//!
//! Builds an XML document from relational rows. For every root row the
//! walk creates the class element, fills in its column properties, then
//! recurses into related class tables and property tables, querying each
//! with the parent row's key. Sibling order is decided by the shadow tree,
//! so rows can arrive in any order.

use std::collections::HashMap;

use crate::dom::{Document, FragmentMode, NodeId, NodeKind, DOCUMENT_NODE};
use crate::error::{DbmsError, Result};
use crate::filter::{FilterBase, FilterSet, Parameters};
use crate::handler::{Cursor, DataHandlers, KeyFilter, SelectQuery};
use crate::map::link::resolve_order;
use crate::map::{
    ClassTableMap, ColumnMap, InlinedElement, Map, OrderInfo, PropertyKind, PropertyMap, PropertyTableMap,
    RelatedClassTableMap, Table,
};
use crate::ordered::{OrderedNodeId, ShadowTree, UNORDERED};
use crate::row::Row;
use crate::value::Value;

/// Externally built result sets, by the name result-set filters use
pub type ResultSets = HashMap<String, Box<dyn Cursor>>;

/// Unique-child key of the text node collecting token-list PCDATA
const PCDATA_KEY: &str = "#pcdata";

/// Transfers data from the database to an XML document
#[derive(Debug)]
pub struct DbmsToDom {
    handlers: DataHandlers,
    fragment_mode: FragmentMode,
}

impl DbmsToDom {
    pub fn new(handlers: DataHandlers) -> Self {
        DbmsToDom {
            handlers,
            fragment_mode: FragmentMode::default(),
        }
    }

    /// How columns containing literal XML are parsed
    pub fn with_fragment_mode(mut self, mode: FragmentMode) -> Self {
        self.fragment_mode = mode;
        self
    }

    pub fn handlers_mut(&mut self) -> &mut DataHandlers {
        &mut self.handlers
    }

    pub fn into_handlers(self) -> DataHandlers {
        self.handlers
    }

    /// Build a document from the rows selected by `filters`
    pub fn retrieve_document(
        &mut self,
        map: &Map,
        filters: &mut FilterSet,
        parameters: &Parameters,
    ) -> Result<Document> {
        self.retrieve_document_with(map, filters, parameters, ResultSets::new())
    }

    /// Like [`retrieve_document`](Self::retrieve_document), with result sets
    /// for result-set filters
    pub fn retrieve_document_with(
        &mut self,
        map: &Map,
        filters: &mut FilterSet,
        parameters: &Parameters,
        mut result_sets: ResultSets,
    ) -> Result<Document> {
        filters.set_parameters(parameters);
        filters.validate()?;

        let mut doc = Document::new();
        for (prefix, uri) in map.namespaces() {
            doc.declare_namespace(prefix, uri);
        }

        let mut tree = ShadowTree::new(DOCUMENT_NODE);
        let mut parent = tree.root();
        for wrapper in filters.wrappers() {
            let qname = wrapper.qualified();
            let element = doc.create_element(map.namespace_uri(wrapper)?, &qname);
            parent = tree.insert_child(&mut doc, parent, Some(&qname), element, UNORDERED, true);
        }

        for filter in filters.filters_mut() {
            let mut ctx = RetrievalContext {
                map,
                filter,
                handlers: &mut self.handlers,
                doc: &mut doc,
                tree: &mut tree,
                fragment_mode: self.fragment_mode,
            };
            ctx.process_root(parent, &mut result_sets)?;
        }

        log::debug!("retrieved document with {} nodes", doc.node_count());
        Ok(doc)
    }
}

/// Where the nodes of one mapping go: a class element and the inlined
/// elements leading from it, with their order values
struct Placement<'m> {
    node: OrderedNodeId,
    inlined: &'m [InlinedElement],
    orders: Vec<(i64, bool)>,
}

impl<'m> Placement<'m> {
    fn direct(node: OrderedNodeId) -> Self {
        Placement {
            node,
            inlined: &[],
            orders: Vec::new(),
        }
    }

    fn inlined(node: OrderedNodeId, inlined: &'m [InlinedElement], row: &Row) -> Result<Self> {
        let orders = inlined
            .iter()
            .map(|e| resolve_order(e.order.as_ref(), row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Placement { node, inlined, orders })
    }
}

/// State of one retrieval, threaded through the recursion
struct RetrievalContext<'a> {
    map: &'a Map,
    filter: &'a mut FilterBase,
    handlers: &'a mut DataHandlers,
    doc: &'a mut Document,
    tree: &'a mut ShadowTree,
    fragment_mode: FragmentMode,
}

impl<'a> RetrievalContext<'a> {
    fn process_root(&mut self, parent: OrderedNodeId, result_sets: &mut ResultSets) -> Result<()> {
        let class_id = self.map.require_class_table_map(self.filter.table())?;
        let class_map = self.map.class_table_map(class_id);

        let cursor = match &mut *self.filter {
            FilterBase::Root(root) => {
                let conditions = root.conditions.resolve()?;
                let query = SelectQuery {
                    where_clause: conditions.where_clause,
                    param_columns: conditions.columns,
                    param_values: conditions.values,
                    ..SelectQuery::table(&class_map.table)
                };
                log::debug!("SELECT root {} where {:?}", class_map.table.name, query.where_clause);
                self.handlers.for_table(&class_map.table.name)?.select(&query)?
            }
            FilterBase::ResultSet(result_set) => {
                log::debug!("root rows of {} from result set {}", class_map.table.name, result_set.name);
                result_sets
                    .remove(&result_set.name)
                    .ok_or_else(|| DbmsError::MissingResultSet(result_set.name.clone()))?
            }
        };

        self.process_class_rows(class_map, cursor, &Placement::direct(parent), None)
    }

    /// SELECT rows of a table below the root, restricted by its table filter
    fn select(&mut self, table: &Table, key: KeyFilter<'_>, order: Option<&OrderInfo>) -> Result<Box<dyn Cursor>> {
        let conditions = match self.filter.table_filter_mut(&table.name) {
            Some(filter) => Some(filter.resolve()?),
            None => None,
        };
        let query = SelectQuery {
            table,
            key: Some(key),
            where_clause: conditions.and_then(|c| c.where_clause),
            param_columns: conditions.and_then(|c| c.columns),
            param_values: conditions.and_then(|c| c.values),
            order,
        };
        log::debug!("SELECT {} key {:?} where {:?}", table.name, key.values, query.where_clause);
        Ok(self.handlers.for_table(&table.name)?.select(&query)?)
    }

    fn process_class_rows(
        &mut self,
        class_map: &'a ClassTableMap,
        mut cursor: Box<dyn Cursor>,
        placement: &Placement<'_>,
        order: Option<&'a OrderInfo>,
    ) -> Result<()> {
        let mut row = Row::new();
        while cursor.advance()? {
            row.load(cursor.as_ref(), class_map.table.columns())?;
            let parent = self.place(placement)?;
            self.process_class_row(class_map, &row, parent, order)?;
        }
        Ok(())
    }

    fn process_class_row(
        &mut self,
        class_map: &'a ClassTableMap,
        row: &Row,
        parent: OrderedNodeId,
        order: Option<&'a OrderInfo>,
    ) -> Result<()> {
        let name = &class_map.element_type;
        let element = self.doc.create_element(self.map.namespace_uri(name)?, &name.qualified());
        let (order_value, ascending) = resolve_order(order, row)?;
        let node = self.tree.insert_child(self.doc, parent, None, element, order_value, ascending);
        log::trace!("inserted <{}> order {}", name, order_value);

        for column_map in &class_map.column_maps {
            self.process_column(node, column_map, row)?;
        }
        for related in &class_map.related_classes {
            self.process_related_class(related, row, node)?;
        }
        for property_table in &class_map.property_tables {
            self.process_property_table(property_table, row, node)?;
        }

        // Everything below this row is final in the real tree
        self.tree.clear_children(node);
        Ok(())
    }

    fn process_column(&mut self, node: OrderedNodeId, column_map: &'a ColumnMap, row: &Row) -> Result<()> {
        let column = &column_map.column;
        if column.is_unresolved() {
            log::debug!("skipping column {} with unresolved type", column.name);
            return Ok(());
        }
        match row.get(column) {
            None => {
                log::debug!("result does not carry column {}, skipped", column.name);
                Ok(())
            }
            Some(value) => self.add_property(node, &column_map.property, value, row, &column.name),
        }
    }

    fn process_related_class(
        &mut self,
        related: &'a RelatedClassTableMap,
        row: &Row,
        node: OrderedNodeId,
    ) -> Result<()> {
        let child_map = self.map.class_table_map(related.class_map);
        let Some(key) = row.key_values(&related.link.parent_key) else {
            log::debug!("NULL key, no rows of {} for this row", child_map.table.name);
            return Ok(());
        };
        let placement = Placement::inlined(node, &related.inlined, row)?;
        let key = KeyFilter {
            columns: &related.link.child_key,
            values: &key,
        };
        let cursor = self.select(&child_map.table, key, related.order.as_ref())?;
        self.process_class_rows(child_map, cursor, &placement, related.order.as_ref())
    }

    fn process_property_table(
        &mut self,
        property_table: &'a PropertyTableMap,
        row: &Row,
        node: OrderedNodeId,
    ) -> Result<()> {
        let column = &property_table.column;
        if column.is_unresolved() {
            log::debug!("skipping property table {} with unresolved column type", property_table.table.name);
            return Ok(());
        }
        let Some(key) = row.key_values(&property_table.link.parent_key) else {
            return Ok(());
        };
        let key = KeyFilter {
            columns: &property_table.link.child_key,
            values: &key,
        };
        let mut cursor = self.select(&property_table.table, key, property_table.property.order.as_ref())?;

        let mut value_row = Row::new();
        while cursor.advance()? {
            value_row.load(cursor.as_ref(), property_table.table.columns())?;
            match value_row.get(column) {
                Some(value) => self.add_property(node, &property_table.property, value, &value_row, &column.name)?,
                None => log::debug!("result does not carry column {}, skipped", column.name),
            }
        }
        Ok(())
    }

    /// Create or reuse the inlined elements of a placement
    fn place(&mut self, placement: &Placement<'_>) -> Result<OrderedNodeId> {
        let mut parent = placement.node;
        for (inlined, &(order, ascending)) in placement.inlined.iter().zip(&placement.orders) {
            let qname = inlined.name.qualified();
            parent = match self.tree.unique_child(parent, &qname) {
                Some(existing) => existing,
                None => {
                    let element = self.doc.create_element(self.map.namespace_uri(&inlined.name)?, &qname);
                    self.tree.insert_child(self.doc, parent, Some(&qname), element, order, ascending)
                }
            };
        }
        Ok(parent)
    }

    /// Emit one value as an attribute, element or PCDATA of `node`
    ///
    /// `row` supplies order values for the property and its inlined elements.
    fn add_property(
        &mut self,
        node: OrderedNodeId,
        property: &PropertyMap,
        value: &Value,
        row: &Row,
        column: &str,
    ) -> Result<()> {
        let Some(text) = value.to_xml_string() else {
            return Ok(());
        };
        let parent = self.place(&Placement::inlined(node, &property.inlined, row)?)?;
        let (order_value, ascending) = resolve_order(property.order.as_ref(), row)?;

        match property.kind {
            PropertyKind::Attribute => {
                let qname = property.name.qualified();
                let element = self.tree.real_node(parent);
                if property.token_list {
                    self.doc.append_attribute_token(element, &qname, &text);
                } else {
                    self.doc.set_attribute(element, &qname, &text);
                }
            }
            PropertyKind::ElementType => {
                let qname = property.name.qualified();
                if property.token_list {
                    if let Some(existing) = self.tree.unique_child(parent, &qname) {
                        let element = self.tree.real_node(existing);
                        self.append_token(element, &text);
                        return Ok(());
                    }
                }
                let element = self.doc.create_element(self.map.namespace_uri(&property.name)?, &qname);
                let unique = property.token_list.then_some(qname.as_str());
                self.tree.insert_child(self.doc, parent, unique, element, order_value, ascending);
                if property.contains_xml {
                    for child in self.parse_xml(&text, column)? {
                        self.doc.append_child(element, child);
                    }
                } else {
                    let text_node = self.doc.create_text(&text);
                    self.doc.append_child(element, text_node);
                }
            }
            PropertyKind::PcData => {
                if property.contains_xml {
                    for child in self.parse_xml(&text, column)? {
                        self.tree.insert_child(self.doc, parent, None, child, order_value, ascending);
                    }
                } else if property.token_list {
                    match self.tree.unique_child(parent, PCDATA_KEY) {
                        Some(existing) => {
                            let text_node = self.tree.real_node(existing);
                            self.append_token_text(text_node, &text);
                        }
                        None => {
                            let text_node = self.doc.create_text(&text);
                            self.tree
                                .insert_child(self.doc, parent, Some(PCDATA_KEY), text_node, order_value, ascending);
                        }
                    }
                } else {
                    let text_node = self.doc.create_text(&text);
                    self.tree.insert_child(self.doc, parent, None, text_node, order_value, ascending);
                }
            }
        }
        Ok(())
    }

    /// Append a token to the text of a token-list element
    fn append_token(&mut self, element: NodeId, token: &str) {
        match self.doc.last_child(element) {
            Some(last) if self.doc.kind(last) == Some(NodeKind::Text) => self.append_token_text(last, token),
            _ => {
                let text_node = self.doc.create_text(token);
                self.doc.append_child(element, text_node);
            }
        }
    }

    fn append_token_text(&mut self, text_node: NodeId, token: &str) {
        self.doc.append_text(text_node, " ");
        self.doc.append_text(text_node, token);
    }

    fn parse_xml(&mut self, text: &str, column: &str) -> Result<Vec<NodeId>> {
        self.doc
            .parse_fragment(text, self.fragment_mode)
            .map_err(|e| DbmsError::MalformedXml {
                column: column.to_string(),
                message: e.to_string(),
            })
    }
}
