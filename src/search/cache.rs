//! File cache for search server responses, keyed by query.

use crate::search::error::FetchError;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

/// Stores one JSON file per query in a directory
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Create a cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File a query's response is cached in
    pub fn path_for(&self, query: &str) -> PathBuf {
        let key: String = query
            .chars()
            .map(|c| match c {
                ' ' | '/' | '\\' => '_',
                c => c,
            })
            .collect();
        self.dir.join(format!("{}.json", key))
    }

    /// Cached response for `query`, if any
    pub async fn get(&self, query: &str) -> Result<Option<Value>, FetchError> {
        let path = self.path_for(query);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                debug!("Cache hit for '{}' at {}", query, path.display());
                Ok(Some(serde_json::from_str(&text)?))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Cache the response for `query`
    pub async fn put(&self, query: &str, payload: &Value) -> Result<(), FetchError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(query);
        tokio::fs::write(&path, serde_json::to_string(payload)?).await?;
        debug!("Cached response for '{}' at {}", query, path.display());
        Ok(())
    }
}
