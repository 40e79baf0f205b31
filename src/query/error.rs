//! Query error types
//!
//! Defines all error conditions that can occur during query compilation and
//! execution.

use thiserror::Error;

use crate::client::ClientError;
use crate::schema::SchemaError;
use crate::series::ExtractError;
use crate::sql::SqlError;
use crate::time::FormatError;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Request is missing a required field or is malformed
    #[error("Invalid query: {0}")]
    Invalid(String),

    /// No time column given and none declared by the table
    #[error("Table {0} has no date-time column")]
    MissingTimeColumn(String),

    /// Format or granularity could not be parsed
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// SQL generation or macro expansion failed
    #[error("SQL error: {0}")]
    Sql(#[from] SqlError),

    /// Table metadata unavailable
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Engine request failed
    #[error("Engine error: {0}")]
    Client(#[from] ClientError),

    /// Result could not be turned into series
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
