//! Error types for the crm-logger library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the record store.

use thiserror::Error;

/// Errors that can occur in the crm-logger application.
#[derive(Error, Debug)]
pub enum CrmError {
    /// SQLite backend errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// CSV read/write errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be mapped into a typed record
    #[error("Invalid {table} record: {reason}")]
    InvalidRecord {
        /// Table the row came from
        table: String,
        /// What was wrong with it
        reason: String,
    },

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Rejected user input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The table's backend could not be reached when the store was built
    #[error("{table} store is unavailable: {reason}")]
    Unavailable {
        /// Logical table name
        table: String,
        /// One-line diagnostic captured at construction
        reason: String,
    },

    /// A targeted update pointed past the end of the table
    #[error("Row {index} does not exist in {table}")]
    RowOutOfRange {
        /// Logical table name
        table: String,
        /// Zero-based data row index
        index: usize,
    },

    /// A targeted update named a column the table does not have
    #[error("Column '{column}' does not exist in {table}")]
    UnknownColumn {
        /// Logical table name
        table: String,
        /// Requested column
        column: String,
    },

    /// An existing table's header differs from the schema
    #[error("{table} has an unexpected header: {found}")]
    HeaderMismatch {
        /// Logical table name
        table: String,
        /// Header found in storage, comma-joined
        found: String,
    },

    /// Login failed or no session is active
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience type alias for Result with `CrmError`
pub type Result<T> = std::result::Result<T, CrmError>;

impl CrmError {
    /// Build an [`CrmError::InvalidRecord`] for `table`.
    pub fn invalid_record(table: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}
