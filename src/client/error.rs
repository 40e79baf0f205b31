//! Client error types

use thiserror::Error;

/// Errors that can occur talking to the broker or controller
#[derive(Error, Debug)]
pub enum ClientError {
    /// Underlying HTTP failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Endpoint could not be reached
    #[error("Service unavailable at {0}")]
    Unavailable(String),

    /// Non-success HTTP status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Classify a transport error
    pub(crate) fn from_transport(e: reqwest::Error, url: &str) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_connect() {
            ClientError::Unavailable(url.to_string())
        } else {
            ClientError::Request(e)
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
