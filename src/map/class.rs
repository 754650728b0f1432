//! Class, Property and Related-Class Maps
//!
//! A class table maps to an element type. Its columns, property tables and
//! related class tables map to the attributes, child elements and PCDATA of
//! that element.

use std::fmt;

use crate::map::link::{LinkInfo, OrderInfo};
use crate::map::table::{Column, Table};

/// Index of a class table map inside its [`Map`](super::Map)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassMapId(pub(crate) usize);

/// Element or attribute name with optional namespace prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XmlName {
    pub prefix: Option<String>,
    pub local_name: String,
}

impl XmlName {
    pub fn new(local_name: impl Into<String>) -> Self {
        XmlName {
            prefix: None,
            local_name: local_name.into(),
        }
    }

    pub fn prefixed(prefix: impl Into<String>, local_name: impl Into<String>) -> Self {
        XmlName {
            prefix: Some(prefix.into()),
            local_name: local_name.into(),
        }
    }

    /// Parse `prefix:local` or `local`
    pub fn parse(qname: &str) -> Self {
        match qname.split_once(':') {
            Some((prefix, local)) => Self::prefixed(prefix, local),
            None => Self::new(qname),
        }
    }

    /// Name as written in the document
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.local_name),
            None => self.local_name.clone(),
        }
    }
}

impl fmt::Display for XmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{}:{}", p, self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

/// What kind of XML construct a property becomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// Attribute of the parent element
    Attribute,
    /// Child element containing the value as text
    ElementType,
    /// Text content of the parent element
    PcData,
}

/// Synthetic element between a class element and a mapped node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinedElement {
    pub name: XmlName,
    pub order: Option<OrderInfo>,
}

impl InlinedElement {
    pub fn new(name: XmlName) -> Self {
        InlinedElement { name, order: None }
    }

    pub fn with_order(mut self, order: OrderInfo) -> Self {
        self.order = Some(order);
        self
    }
}

/// Mapping of one scalar value to an attribute, element or PCDATA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMap {
    /// Attribute or element name; unused for PCDATA
    pub name: XmlName,
    pub kind: PropertyKind,
    /// Multiple values are joined with a single space into one node
    pub token_list: bool,
    /// The value is literal XML markup to be parsed into nodes
    pub contains_xml: bool,
    pub order: Option<OrderInfo>,
    /// Intermediate elements, outermost first
    pub inlined: Vec<InlinedElement>,
}

impl PropertyMap {
    pub fn attribute(name: XmlName) -> Self {
        Self::with_kind(name, PropertyKind::Attribute)
    }

    pub fn element(name: XmlName) -> Self {
        Self::with_kind(name, PropertyKind::ElementType)
    }

    pub fn pcdata() -> Self {
        Self::with_kind(XmlName::new("#pcdata"), PropertyKind::PcData)
    }

    fn with_kind(name: XmlName, kind: PropertyKind) -> Self {
        PropertyMap {
            name,
            kind,
            token_list: false,
            contains_xml: false,
            order: None,
            inlined: Vec::new(),
        }
    }

    pub fn token_list(mut self) -> Self {
        self.token_list = true;
        self
    }

    pub fn containing_xml(mut self) -> Self {
        self.contains_xml = true;
        self
    }

    pub fn with_order(mut self, order: OrderInfo) -> Self {
        self.order = Some(order);
        self
    }

    pub fn inlined_in(mut self, element: InlinedElement) -> Self {
        self.inlined.push(element);
        self
    }
}

/// A column of the class table mapped to a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub column: Column,
    pub property: PropertyMap,
}

/// A class table reachable from another class table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedClassTableMap {
    pub class_map: ClassMapId,
    pub link: LinkInfo,
    pub order: Option<OrderInfo>,
    pub inlined: Vec<InlinedElement>,
}

impl RelatedClassTableMap {
    pub fn new(class_map: ClassMapId, link: LinkInfo) -> Self {
        RelatedClassTableMap {
            class_map,
            link,
            order: None,
            inlined: Vec::new(),
        }
    }

    pub fn with_order(mut self, order: OrderInfo) -> Self {
        self.order = Some(order);
        self
    }

    pub fn inlined_in(mut self, element: InlinedElement) -> Self {
        self.inlined.push(element);
        self
    }
}

/// A table holding one property value per row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTableMap {
    pub table: Table,
    pub column: Column,
    pub property: PropertyMap,
    pub link: LinkInfo,
}

/// A table mapped to an element type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTableMap {
    pub table: Table,
    pub element_type: XmlName,
    pub column_maps: Vec<ColumnMap>,
    pub related_classes: Vec<RelatedClassTableMap>,
    pub property_tables: Vec<PropertyTableMap>,
}

impl ClassTableMap {
    pub fn new(table: Table, element_type: XmlName) -> Self {
        ClassTableMap {
            table,
            element_type,
            column_maps: Vec::new(),
            related_classes: Vec::new(),
            property_tables: Vec::new(),
        }
    }

    /// Map a column of this table to a property
    pub fn with_column(mut self, column: &str, property: PropertyMap) -> Self {
        let column = self.table.columns_named(&[column]).remove(0);
        self.column_maps.push(ColumnMap { column, property });
        self
    }

    pub fn with_property_table(mut self, property_table: PropertyTableMap) -> Self {
        self.property_tables.push(property_table);
        self
    }

    /// No related class tables and no property tables hang off this table
    pub fn is_leaf(&self) -> bool {
        self.related_classes.is_empty() && self.property_tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::table::{SqlType, TableName};

    #[test]
    fn test_xml_name() {
        let name = XmlName::parse("po:Order");
        assert_eq!(name.prefix.as_deref(), Some("po"));
        assert_eq!(name.local_name, "Order");
        assert_eq!(name.qualified(), "po:Order");
        assert_eq!(XmlName::parse("Order").qualified(), "Order");
    }

    #[test]
    fn test_class_map_columns() {
        let table = Table::new(TableName::new("Orders"))
            .with_column("OrderID", SqlType::Integer)
            .with_column("Date", SqlType::Date);
        let map = ClassTableMap::new(table, XmlName::new("Order"))
            .with_column("OrderID", PropertyMap::attribute(XmlName::new("id")))
            .with_column("Date", PropertyMap::element(XmlName::new("Date")).token_list());

        assert_eq!(map.column_maps.len(), 2);
        assert_eq!(map.column_maps[1].column.sql_type, SqlType::Date);
        assert!(map.column_maps[1].property.token_list);
        assert!(map.is_leaf());
    }
}
