//! SQL generation error types

use crate::time::FormatError;
use thiserror::Error;

/// Errors that can occur while building SQL text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SqlError {
    /// Format or granularity could not be parsed or encoded
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Macro invoked with the wrong number of arguments
    #[error("expected {expected} argument(s), got {got}")]
    ArgumentCount { expected: &'static str, got: usize },

    /// Macro argument present but empty
    #[error("argument {0} must not be empty")]
    EmptyArgument(usize),

    /// Expansion of a macro failed
    #[error("failed to expand $__{name} at line {line}, column {column}: {source}")]
    Macro {
        name: String,
        line: usize,
        column: usize,
        #[source]
        source: Box<SqlError>,
    },
}

/// Result type for SQL generation
pub type SqlResult<T> = Result<T, SqlError>;
