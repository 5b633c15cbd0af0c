//! Catalog client error types.

use thiserror::Error;

/// A catalog request failed.
///
/// Request paths are reported without their query string so credentials
/// never end up in logs.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failure, timeout or truncated body
    #[error("Transport error on {path}: {message}")]
    Transport { path: String, message: String },

    /// Non-success HTTP status
    #[error("HTTP {status} on {path}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    /// Every attempt failed with a retryable error
    #[error("Gave up on {path} after {attempts} attempts: {last}")]
    RetriesExhausted {
        path: String,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },

    /// Body was not the expected JSON shape
    #[error("Failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    /// Request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// HTTP status of the final response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}

/// Statuses worth retrying: rate limiting and transient server errors.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Errors building a catalog client.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request failure
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
