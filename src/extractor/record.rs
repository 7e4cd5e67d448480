//! Final structured records built from surviving groups.

use super::grouper::CandidateGroup;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single extracted search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Unique ID of the record
    pub id: Uuid,

    /// ID of the user the search belongs to
    pub owner_id: String,

    /// Space-joined url fragments
    pub url: String,

    /// First date fragment of the result
    pub date: String,

    /// Space-joined body fragments
    pub body: String,

    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl ExtractedRecord {
    /// Create a record with a fresh ID and the current time
    pub fn new(
        owner_id: impl Into<String>,
        url: impl Into<String>,
        date: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            url: url.into(),
            date: date.into(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }

    /// Build a record from a candidate group
    pub fn from_group(owner_id: &str, group: &CandidateGroup) -> Self {
        Self::new(
            owner_id,
            group.url_text(),
            group.date_text(),
            group.body_text(),
        )
    }

    /// The url, date and body fields, ignoring identity and timestamp
    pub fn fields(&self) -> (&str, &str, &str) {
        (&self.url, &self.date, &self.body)
    }
}

/// Map filtered groups into records owned by `owner_id`
pub fn build_records(owner_id: &str, groups: &[CandidateGroup]) -> Vec<ExtractedRecord> {
    groups
        .iter()
        .map(|group| ExtractedRecord::from_group(owner_id, group))
        .collect()
}
