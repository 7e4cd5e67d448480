//! # Storage Error Types
//!
//! Errors raised by the libsql store. Failures talking to the database are
//! transient and retried by the store's retry policy; malformed rows and
//! schema problems are not.

use crate::error::Error as CrateError;
use crate::retry::Retryable;
use thiserror::Error;

/// Error type for database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// SQL query error
    #[error("SQL query error: {0}")]
    Query(String),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// A stored row could not be decoded
    #[error("Data error: {0}")]
    Data(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl Retryable for DbError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Query(_) | DbError::Connection(_) | DbError::Transaction(_)
        )
    }
}

impl From<DbError> for CrateError {
    fn from(err: DbError) -> Self {
        CrateError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DbError::Query("locked".to_string()).is_transient());
        assert!(DbError::Connection("refused".to_string()).is_transient());
        assert!(!DbError::Data("bad uuid".to_string()).is_transient());
        assert!(!DbError::Schema("no table".to_string()).is_transient());
    }

    #[test]
    fn test_into_crate_error() {
        let err: CrateError = DbError::Data("bad row".to_string()).into();
        assert_eq!(err.to_string(), "Database error: Data error: bad row");
    }
}
