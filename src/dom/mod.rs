//! DOM Module - Arena-based Output Document
//!
//! The XML tree a retrieval builds:
//! - Arena allocation for nodes
//! - NodeId (u32) indices, nodes linked by index
//! - String interning for names and character data
//! - Namespace resolution stack for parsed fragments
//! - Iterative serializer

pub mod document;
pub mod fragment;
pub mod namespace;
pub mod node;
pub mod serialize;
pub mod strings;

pub use document::{Children, Document, DOCUMENT_NODE};
pub use fragment::{FragmentError, FragmentMode};
pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode};
pub use strings::StringPool;
