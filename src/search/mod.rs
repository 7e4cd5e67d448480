//! Search server collaborator
//!
//! Fetches raw result pages for a query from the search server, rate limited
//! and retried, with an optional file cache so repeated queries never hit the
//! network twice.

mod cache;
mod client;
mod error;

pub use cache::FileCache;
pub use client::{SearchClient, result_html};
pub use error::FetchError;
