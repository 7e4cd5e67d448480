//! Reassemble tagged fragments into candidate search results.

use super::classifier::{TextClass, classify};
use super::tagger::TaggedText;
use serde::Serialize;
use tracing::trace;

/// Fragments sharing a group identifier, bucketed by field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateGroup {
    /// Path prefix through the first list-item marker
    pub identifier: String,
    pub date_items: Vec<TaggedText>,
    pub url_items: Vec<TaggedText>,
    pub body_items: Vec<TaggedText>,
}

impl CandidateGroup {
    /// Create an empty group
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            date_items: Vec::new(),
            url_items: Vec::new(),
            body_items: Vec::new(),
        }
    }

    /// Route a fragment into its bucket. Only the first date is kept.
    pub fn push(&mut self, item: TaggedText) {
        match classify(&item.text) {
            TextClass::Date if self.date_items.is_empty() => self.date_items.push(item),
            TextClass::Date => {
                trace!(identifier = %self.identifier, text = %item.text, "dropping extra date");
            }
            TextClass::Url => self.url_items.push(item),
            TextClass::Body => self.body_items.push(item),
        }
    }

    /// Number of non-empty buckets, 0 to 3
    pub fn information_count(&self) -> usize {
        [&self.date_items, &self.url_items, &self.body_items]
            .iter()
            .filter(|items| !items.is_empty())
            .count()
    }

    pub fn date_text(&self) -> String {
        join_text(&self.date_items)
    }

    pub fn url_text(&self) -> String {
        join_text(&self.url_items)
    }

    pub fn body_text(&self) -> String {
        join_text(&self.body_items)
    }
}

fn join_text(items: &[TaggedText]) -> String {
    items
        .iter()
        .map(|item| item.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group fragments in document order.
///
/// Fragments outside any list item are discarded. A group is closed as soon
/// as the identifier changes, so an identifier that comes back later opens a
/// second group.
pub fn group_tagged(items: impl IntoIterator<Item = TaggedText>) -> Vec<CandidateGroup> {
    let mut groups = Vec::new();
    let mut current: Option<CandidateGroup> = None;

    for item in items {
        let Some(identifier) = item.group_identifier() else {
            continue;
        };

        match current.as_mut() {
            Some(group) if group.identifier == identifier => group.push(item),
            _ => {
                if let Some(done) = current.take() {
                    groups.push(done);
                }
                let mut group = CandidateGroup::new(identifier);
                group.push(item);
                current = Some(group);
            }
        }
    }

    groups.extend(current);
    groups
}
