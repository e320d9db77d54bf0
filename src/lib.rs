//! Shelf - Session-managed document indexes over Tantivy
//!
//! Stores JSON-shaped entities in named Tantivy indexes and queries them
//! through a filter/sort/paging composer. Sessions (one writer and one
//! reader per index) are created on demand, shared across tasks, and can
//! be fenced off by exclusive gates while an index is deleted or swapped.
//!
//! # Architecture
//!
//! - **core**: Domain logic
//!   - config, error, types, xdg
//!   - storage (configurations, directories, sessions, mapping, health)
//!   - search (filters, query compilation, collection, composer)
//!   - scope, provider, services
//!
//! - **cli**: Command-line adapter (depends on core)
//!   - commands, output formatting

// Core domain logic
pub mod core;

// CLI adapter
pub mod cli;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{Result, ShelfError};
pub use core::provider::IndexProvider;
pub use core::scope::{ScopeEnd, UnitOfWork};
pub use core::search::{Occurrence, QueryComposer, QueryFilter, SearchRequest, SortSpec};
pub use core::services::Services;
pub use core::types::*;
