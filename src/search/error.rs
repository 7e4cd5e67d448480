//! # Fetch Error Types Module
//!
//! Errors raised while retrieving raw result pages from the search server or
//! the on-disk response cache.

use crate::error::Error as CrateError;
use crate::retry::Retryable;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while fetching search results
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Search server answered with a non-success status
    #[error("Search server returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: StatusCode,
        /// Response body
        body: String,
    },

    /// Endpoint could not be parsed
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Payload has no `result` markup
    #[error("Response for '{0}' has no result markup")]
    MissingResult(String),

    /// Cache read/write error
    #[error("Cache error: {0}")]
    Cache(#[from] std::io::Error),

    /// Cached or received JSON is malformed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Retryable for FetchError {
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

impl From<FetchError> for CrateError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Http(e) => CrateError::Http(e),
            FetchError::Json(e) => CrateError::Json(e),
            _ => CrateError::Fetch(err.to_string()),
        }
    }
}
