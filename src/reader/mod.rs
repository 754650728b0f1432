//! XML Reader Module
//!
//! - FragmentReader: pull reader over literal XML stored in a column
//! - Events: event types produced by the reader

pub mod events;
pub mod fragment;

pub use events::{StartElement, XmlEvent};
pub use fragment::{FragmentReader, ParseError};
