//! xmldbms - Map-driven transfer between relational tables and XML
//!
//! Operations:
//! A: Retrieval (`DbmsToDom`): rows selected by a filter set become an XML
//!    document, shaped by a compiled `Map`
//! B: Deletion (`DbmsDeleter`): the same rows are deleted, children before
//!    or after their parents depending on which side holds the foreign key
//!
//! The database is reached only through the `DataHandler` and `Cursor`
//! traits; `MemoryDataHandler` is an in-memory implementation.
//!
//! ```
//! use xmldbms::{
//!     ClassTableMap, DataHandlers, DbmsToDom, FilterSet, Map, MemoryDataHandler, MemoryDatabase,
//!     Parameters, PropertyMap, RootFilter, SqlType, Table, TableName, XmlName,
//! };
//!
//! let db = MemoryDatabase::shared();
//! db.borrow_mut()
//!     .create_table("Parts", &["PartID", "Name"])
//!     .push(vec![7.into(), "bolt".into()]);
//!
//! let table = Table::new(TableName::new("Parts"))
//!     .with_column("PartID", SqlType::Integer)
//!     .with_column("Name", SqlType::Varchar);
//! let mut map = Map::new();
//! map.add_class_table_map(
//!     ClassTableMap::new(table.clone(), XmlName::new("Part"))
//!         .with_column("PartID", PropertyMap::attribute(XmlName::new("id")))
//!         .with_column("Name", PropertyMap::element(XmlName::new("Name"))),
//! );
//!
//! let mut filters = FilterSet::new().with_filter(RootFilter::new(table));
//! let mut transfer = DbmsToDom::new(DataHandlers::single(MemoryDataHandler::new(db)));
//! let doc = transfer.retrieve_document(&map, &mut filters, &Parameters::new()).unwrap();
//! assert_eq!(doc.to_xml(), "<Part id=\"7\"><Name>bolt</Name></Part>");
//! ```

pub mod core;
pub mod dom;
pub mod error;
pub mod filter;
pub mod handler;
pub mod map;
pub mod ordered;
pub mod reader;
pub mod row;
pub mod transfer;
pub mod value;

pub use dom::{Document, FragmentError, FragmentMode, NodeId, NodeKind, DOCUMENT_NODE};
pub use error::{DatabaseError, DatabaseErrorKind, DbmsError, Result};
pub use filter::{FilterBase, FilterConditions, FilterSet, ParamValue, Parameters, ResultSetFilter, RootFilter};
pub use handler::{
    Call, CommitMode, Cursor, DataHandler, DataHandlers, DeleteQuery, KeyFilter, MemoryCursor, MemoryDataHandler,
    MemoryDatabase, SelectQuery,
};
pub use map::{
    ClassMapId, ClassTableMap, Column, InlinedElement, LinkInfo, Map, OrderInfo, PropertyKind, PropertyMap,
    PropertyTableMap, RelatedClassTableMap, SqlType, Table, TableName, XmlName, DEFAULT_DATABASE,
};
pub use ordered::{OrderedNodeId, ShadowTree, UNORDERED};
pub use row::Row;
pub use transfer::{Action, Actions, DbmsDeleter, DbmsToDom, DeleteReport, ResultSets};
pub use value::Value;

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
