//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (ArgumentMismatch, Storage, Database, etc.)
//! - A crate-wide [`Result`] alias
//!
//! The propagation policy is split in two: synchronous validation and setup
//! errors abort the whole `download()` call with no partial effect, while
//! per-item runtime failures are recorded as `Error` item state in the job
//! store and never surface as process-level faults.

use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Input lists to `download()` disagree in length
    #[error(
        "resources, names, and extras must be the same length \
         (resources: {resources}, names: {names}, extras: {extras})"
    )]
    ArgumentMismatch {
        /// Number of fetch capabilities supplied
        resources: usize,
        /// Number of destination names supplied
        names: usize,
        /// Number of per-item argument sets supplied
        extras: usize,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "worker.low_water")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Storage backend error (directory creation, sink open, write)
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error from the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Item or batch not found in the job store
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}
