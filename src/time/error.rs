//! Time model error types
//!
//! Errors raised while parsing datetime formats and granularities, or while
//! encoding and decoding time values.

use thiserror::Error;

/// Errors that can occur in the time model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Datetime format descriptor not recognized
    #[error("Invalid datetime format: '{0}'")]
    InvalidFormat(String),

    /// Granularity descriptor not recognized
    #[error("Invalid granularity: '{0}'")]
    InvalidGranularity(String),

    /// Time unit name not recognized
    #[error("Invalid time unit: '{0}'")]
    InvalidUnit(String),

    /// Size component is zero or not a number
    #[error("Invalid size '{0}': must be a positive integer")]
    InvalidSize(String),

    /// Timestamp does not fit the target representation
    #[error("Timestamp out of range: {0}")]
    OutOfRange(String),

    /// Range start is not before its end
    #[error("Empty time range: {from} is not before {to}")]
    EmptyRange { from: String, to: String },

    /// Value could not be decoded with the given format
    #[error("Cannot decode '{value}' as {format}")]
    Decode { value: String, format: String },
}

/// Result type for time model operations
pub type FormatResult<T> = Result<T, FormatError>;
