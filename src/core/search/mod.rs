//! Query composition and execution.
//!
//! - **filter**: request model (predicates, occurrences, sorts, paging)
//! - **query**: predicate compilation into tantivy queries
//! - **collector**: capped, sorted hit collection
//! - **engine**: execution against session snapshots
//! - **composer**: fluent front end for building requests

pub mod collector;
pub mod composer;
pub mod engine;
pub mod filter;
pub mod query;

pub use composer::QueryComposer;
pub use engine::SearchEngine;
pub use filter::{
    FieldValue, Occurrence, Predicate, QueryFilter, SearchRequest, SortDirection, SortSpec,
    SortValueType,
};
