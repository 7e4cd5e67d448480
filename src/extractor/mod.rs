//! # Search Result Extraction Module
//!
//! Turns search-engine result markup into structured records without a
//! site-specific scraper. Search engines render results as the items of an
//! `ul`/`ol`, so every text fragment is tagged with its ancestor path, the
//! fragments of one list item are grouped back together, each fragment is
//! classified as date, url or body, and groups with fewer than two populated
//! fields are dropped.
//!
//! ## Pipeline
//!
//! document tree → `tag_tree` → `group_tagged` (classifying each fragment) →
//! `filter_candidates` → `build_records`
//!
//! Everything here is synchronous and free of I/O. The same tree always
//! yields the same groups.

mod classifier;
mod filter;
mod grouper;
mod node;
mod record;
mod tagger;

pub use classifier::{BREADCRUMB_SEPARATOR, TextClass, classify, is_date, is_url};
pub use filter::{MIN_INFORMATION_COUNT, filter_candidates, is_search_result};
pub use grouper::{CandidateGroup, group_tagged};
pub use node::{DOCUMENT_TAG, Node};
pub use record::{ExtractedRecord, build_records};
pub use tagger::{Label, PATH_SEPARATOR, TaggedText, label_for, tag_tree};

use tracing::debug;

/// Something that can turn a search result page into records
pub trait SearchResultExtractor: Send + Sync {
    /// Extract the search results of `html`, owned by `owner_id`
    fn extract(&self, html: &str, owner_id: &str) -> Vec<ExtractedRecord>;
}

/// Candidate groups of a document that pass the filter
pub fn extract_groups(root: &Node) -> Vec<CandidateGroup> {
    let tagged = tag_tree(root);
    let tagged_count = tagged.len();
    let groups = group_tagged(tagged);
    let group_count = groups.len();
    let kept = filter_candidates(groups);

    debug!(
        fragments = tagged_count,
        groups = group_count,
        kept = kept.len(),
        "extracted candidate groups"
    );
    kept
}

/// Records of an already parsed document
pub fn extract_records(root: &Node, owner_id: &str) -> Vec<ExtractedRecord> {
    build_records(owner_id, &extract_groups(root))
}

/// Extractor based on tree tagging and list-item grouping
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeExtractor;

impl TreeExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl SearchResultExtractor for TreeExtractor {
    fn extract(&self, html: &str, owner_id: &str) -> Vec<ExtractedRecord> {
        extract_records(&Node::parse_html(html), owner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_item(url: &str, date: &str, body: &str) -> Node {
        Node::element(
            "li",
            vec![
                Node::element("a", vec![Node::text(url)]),
                Node::element("span", vec![Node::text(date)]),
                Node::element("p", vec![Node::text(body)]),
            ],
        )
    }

    #[test]
    fn test_extract_records_from_tree() {
        let tree = Node::element(
            DOCUMENT_TAG,
            vec![Node::element(
                "ol",
                vec![
                    result_item("www.example.com", "May 14, 2024", "First"),
                    result_item("docs.rs", "Jun 2, 2023", "Second"),
                ],
            )],
        );

        let records = extract_records(&tree, "owner");
        let fields: Vec<_> = records.iter().map(ExtractedRecord::fields).collect();
        assert_eq!(
            fields,
            vec![
                ("www.example.com", "May 14, 2024", "First"),
                ("docs.rs", "Jun 2, 2023", "Second"),
            ]
        );
        assert!(records.iter().all(|r| r.owner_id == "owner"));
    }

    #[test]
    fn test_empty_tree() {
        assert!(extract_groups(&Node::empty_document()).is_empty());
        assert!(TreeExtractor::new().extract("", "owner").is_empty());
    }

    #[test]
    fn test_extractor_is_object_safe() {
        let extractor: Box<dyn SearchResultExtractor> = Box::new(TreeExtractor);
        let records = extractor.extract(
            "<ul><li><a>example.com</a><p>text</p></li></ul>",
            "owner",
        );
        assert_eq!(records.len(), 1);
    }
}
