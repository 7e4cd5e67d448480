//! # sift - Heuristic search result extraction
//!
//! Pulls structured records (url, date, body) out of arbitrary search-engine
//! result pages without per-site selectors, and runs that extraction as a
//! batch job over raw searches kept in LibSQL.
//!
//! ## Features
//!
//! - Site-agnostic extraction based on list-item structure:
//!   - Tree tagging with list-item markers
//!   - Date and url classification of text fragments
//!   - Grouping and filtering of candidate results
//! - Search server client with caching, rate limiting and retries
//! - LibSQL storage for users, raw searches and extracted records
//! - Incremental ETL pipeline tracking each user's last run
//!
//! ## Example
//!
//! ```rust
//! use sift::extractor::{SearchResultExtractor, TreeExtractor};
//!
//! let html = r#"<ul>
//!   <li><a>www.example.com</a><span>May 14, 2024</span><p>An example</p></li>
//! </ul>"#;
//!
//! let records = TreeExtractor::new().extract(html, "user-1");
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].url, "www.example.com");
//! assert_eq!(records[0].date, "May 14, 2024");
//! assert_eq!(records[0].body, "An example");
//! ```

mod error;

pub mod config;
pub mod extractor;
pub mod pipeline;
pub mod retry;
pub mod search;
pub mod store;

pub use error::{Error, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::extractor::{ExtractedRecord, SearchResultExtractor, TreeExtractor};
    pub use crate::pipeline::{EtlPipeline, PipelineReport};
    pub use crate::store::Database;
}
