//! Filter Module - Row Selection
//!
//! - `FilterConditions`: WHERE fragments with `$Name` placeholders
//! - `Parameters`: values bound to placeholders
//! - `FilterBase` / `FilterSet`: root and result-set filters for a document

pub mod conditions;
pub mod params;
pub mod set;

pub use conditions::{FilterConditions, ResolvedConditions};
pub use params::{ParamValue, Parameters};
pub use set::{FilterBase, FilterSet, ResultSetFilter, RootFilter};
