//! Extraction error types

use thiserror::Error;

use crate::time::FormatError;

/// Errors that abort extraction of one result table
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    /// Designated column is absent from the result
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// Row is shorter than the column list
    #[error("row {row} has {len} values, expected {expected}")]
    ShortRow { row: usize, len: usize, expected: usize },

    /// Time value could not be decoded
    #[error("row {row}: cannot decode time value {value}: {source}")]
    Time {
        row: usize,
        value: String,
        #[source]
        source: FormatError,
    },
}

/// Result type for extraction
pub type ExtractResult<T> = Result<T, ExtractError>;
