//! Error types and error handling for the shelf index provider.
//!
//! This module defines the error types used throughout the
//! crate. Read paths recover from most of these locally (see
//! `core::search::engine`); configuration and lock errors always
//! propagate to the caller.

use thiserror::Error;

/// Result type alias for shelf operations
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Main error type for the shelf provider
#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("No configuration registered for index: {0}")]
    ConfigurationMissing(String),

    #[error("Lock for index '{index}' could not be acquired within {waited_ms}ms")]
    LockTimeout { index: String, waited_ms: u64 },

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Invalid index name: {0}")]
    InvalidIndexName(String),

    #[error("Index is read-only: {0}")]
    ReadOnly(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Document mapping failed: {0}")]
    Mapping(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl ShelfError {
    /// Get user-friendly error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ShelfError::IndexNotFound(_) | ShelfError::ConfigurationMissing(_)
        )
    }

    /// Check if this is a lock-timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, ShelfError::LockTimeout { .. })
    }

    /// Check if this is a bad request error (invalid input)
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            ShelfError::InvalidIndexName(_)
                | ShelfError::InvalidQuery(_)
                | ShelfError::Mapping(_)
                | ShelfError::ConfigError(_)
        )
    }
}
