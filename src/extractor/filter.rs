//! Drop candidate groups that are more likely page furniture than results.

use super::grouper::CandidateGroup;

/// Minimum number of populated fields for a group to count as a result
pub const MIN_INFORMATION_COUNT: usize = 2;

/// Whether a group carries enough fields to be a search result
pub fn is_search_result(group: &CandidateGroup) -> bool {
    group.information_count() >= MIN_INFORMATION_COUNT
}

/// Keep only groups with at least two populated fields, preserving order
pub fn filter_candidates(groups: Vec<CandidateGroup>) -> Vec<CandidateGroup> {
    groups.into_iter().filter(is_search_result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::tagger::TaggedText;

    fn fragment(text: &str) -> TaggedText {
        TaggedText {
            tag_path: Vec::new(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_filter_by_information_count() {
        let mut url_only = CandidateGroup::new("a");
        url_only.push(fragment("example.com"));

        let mut url_and_body = CandidateGroup::new("b");
        url_and_body.push(fragment("example.com"));
        url_and_body.push(fragment("snippet text"));

        let mut date_and_body = CandidateGroup::new("c");
        date_and_body.push(fragment("May 14, 2024"));
        date_and_body.push(fragment("snippet text"));

        let kept = filter_candidates(vec![
            CandidateGroup::new("empty"),
            url_only,
            url_and_body,
            date_and_body,
        ]);

        let identifiers: Vec<_> = kept.iter().map(|g| g.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["b", "c"]);
    }

    #[test]
    fn test_body_fragments_alone_never_pass() {
        let mut group = CandidateGroup::new("nav");
        group.push(fragment("Images"));
        group.push(fragment("Videos"));
        group.push(fragment("News"));

        assert_eq!(group.information_count(), 1);
        assert!(!is_search_result(&group));
    }
}
