//! Storage for raw searches, extracted records and pipeline bookkeeping
//!
//! Backed by libsql, either a local database file or a remote server. Every
//! public operation runs under the store's retry policy.

mod database;
pub mod error;
mod schema;

pub use database::Database;
pub use error::DbError;
pub use schema::table_names;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user owning searches and extracted records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// ID of the user
    pub user_id: String,

    /// When the user was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a user with a fresh ID
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    /// Create a user with a known ID
    pub fn with_id(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            created_at: Utc::now(),
        }
    }
}

impl Default for User {
    fn default() -> Self {
        Self::new()
    }
}

/// A raw search as returned by the search server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// ID of the search
    pub search_id: String,

    /// User who issued the search
    pub user_id: String,

    /// Query text
    pub search_term: String,

    /// Result page markup, absent when the search failed
    pub result: Option<String>,

    /// When the search was made
    pub created_at: DateTime<Utc>,
}

impl SearchResult {
    /// Create a search with a fresh ID and the current time
    pub fn new(
        user_id: impl Into<String>,
        search_term: impl Into<String>,
        result: Option<String>,
    ) -> Self {
        Self {
            search_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            search_term: search_term.into(),
            result,
            created_at: Utc::now(),
        }
    }
}

/// Marks that a user's searches were extracted up to `last_run`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastExtractedUserStatus {
    /// ID of the status row
    pub id: String,

    /// User the run covered
    pub user_id: String,

    /// When the run happened
    pub last_run: DateTime<Utc>,
}

impl LastExtractedUserStatus {
    /// Status for a run at a given time
    pub fn at(user_id: impl Into<String>, last_run: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            last_run,
        }
    }
}
