//! Quarry Core - Building blocks of the search query DSL
//!
//! This crate defines the structural pieces a query is assembled from:
//! - `FieldRef`: a single field or an ordered group of fields
//! - `Clause` / `ClauseKind`: one DSL filter expression
//! - `FilterSet`: the `must` / `must_not` clause lists of a boolean query
//! - `RangeBounds`, `DateValue`, `dense_values`: value normalization helpers
//! - `Script`, `SortOrder`: request parameters carried alongside the filters

pub mod clause;
pub mod error;
pub mod field;
pub mod range;
pub mod script;
pub mod sort;

pub use clause::*;
pub use error::*;
pub use field::*;
pub use range::*;
pub use script::*;
pub use sort::*;
