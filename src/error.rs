//! Error types for the sift crate

use thiserror::Error;

/// Result type for sift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sift operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Search fetching error
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),
}
