//! # Database Schema Module
//!
//! Four tables back the extraction pipeline:
//! 1. `users` - owners of searches and extracted records
//! 2. `search_results` - raw result pages as returned by the search server
//! 3. `extracted_search_results` - records produced by the extractor
//! 4. `last_extracted_user_status` - one row per pipeline run and user, used
//!    to pick up only searches created since the previous run
//!
//! Timestamps are Unix milliseconds.

use crate::store::error::DbError;
use libsql::{Connection, params};

const TABLES: &[(&str, &str)] = &[
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        )",
    ),
    (
        "search_results",
        "CREATE TABLE IF NOT EXISTS search_results (
            search_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            search_term TEXT NOT NULL,
            result TEXT,
            created_at INTEGER NOT NULL
        )",
    ),
    (
        "extracted_search_results",
        "CREATE TABLE IF NOT EXISTS extracted_search_results (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            url TEXT NOT NULL,
            date TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
    ),
    (
        "last_extracted_user_status",
        "CREATE TABLE IF NOT EXISTS last_extracted_user_status (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            last_run INTEGER NOT NULL
        )",
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_search_results_user_created
        ON search_results(user_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_extracted_user ON extracted_search_results(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_status_user_run
        ON last_extracted_user_status(user_id, last_run)",
];

/// Names of all tables created by `initialize_schema`
pub fn table_names() -> impl Iterator<Item = &'static str> {
    TABLES.iter().map(|(name, _)| *name)
}

/// Initialize the database schema
pub async fn initialize_schema(conn: &Connection) -> Result<(), DbError> {
    for (name, ddl) in TABLES {
        conn.execute(ddl, params![])
            .await
            .map_err(|e| DbError::Schema(format!("Failed to create {} table: {}", name, e)))?;
    }

    for ddl in INDEXES {
        conn.execute(ddl, params![])
            .await
            .map_err(|e| DbError::Schema(format!("Failed to create index: {}", e)))?;
    }

    Ok(())
}
