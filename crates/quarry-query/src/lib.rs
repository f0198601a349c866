//! Quarry Query - Fluent construction and execution of search queries
//!
//! This crate provides:
//! - `SearchQuery`: accumulates filters and request parameters, then executes
//! - `Where`: field-scoped conditions that append clauses to a `SearchQuery`
//! - `SearchExecutor`: the seam to whatever actually talks to the engine
//! - `SearchListener`: success/error hooks run after every execution

pub mod condition;
pub mod config;
pub mod error;
pub mod executor;
pub mod listener;
pub mod query;

pub use condition::*;
pub use config::*;
pub use error::*;
pub use executor::*;
pub use listener::*;
pub use query::*;

pub use quarry_core::{
    dense_values, Clause, ClauseKind, DateValue, FieldRef, FilterSet, RangeBounds, Script,
    SortOrder,
};
