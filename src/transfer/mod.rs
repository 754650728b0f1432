//! Transfer Module - Table Walks
//!
//! - `DbmsToDom`: database rows to an XML document
//! - `DbmsDeleter`: deletion of the rows a document maps to
//! - `Actions`: per element type deletion behavior

pub mod actions;
pub mod delete;
pub mod retrieve;

pub use actions::{Action, Actions};
pub use delete::{DbmsDeleter, DeleteReport};
pub use retrieve::{DbmsToDom, ResultSets};
