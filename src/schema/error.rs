//! Schema error types

use thiserror::Error;

use crate::time::FormatError;

/// Errors that can occur while fetching or reading table metadata
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Table does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Column is not a declared date-time column
    #[error("Column {column} is not a date-time column of {table}")]
    UnknownTimeColumn { table: String, column: String },

    /// Declared format could not be parsed
    #[error("Invalid time format: {0}")]
    Format(#[from] FormatError),

    /// Metadata request failed
    #[error("Metadata request failed: {0}")]
    Client(#[from] crate::client::ClientError),
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
