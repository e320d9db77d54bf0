//! Core domain logic
//!
//! Everything here is independent of the command-line front end.
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Error types and Result alias
//! - **types**: Result containers and the `Entity` binding
//! - **xdg**: XDG directory handling
//! - **storage**: Index configurations, directories, sessions, mapping, health
//! - **search**: Filters, query compilation, sorted collection, composer
//! - **scope**: Unit-of-work scoping over sessions
//! - **provider**: Public index provider surface
//! - **services**: Unified service container

pub mod config;
pub mod error;
pub mod provider;
pub mod scope;
pub mod search;
pub mod services;
pub mod storage;
pub mod types;
pub mod xdg;

// Re-export key types for convenience
pub use config::Config;
pub use error::{Result, ShelfError};
pub use provider::IndexProvider;
pub use scope::{ScopeEnd, UnitOfWork};
pub use services::Services;
