use std::collections::HashSet;

use sift::extractor::{
    ExtractedRecord, Node, SearchResultExtractor, TreeExtractor, extract_groups, tag_tree,
};

const OWNER: &str = "9a895152-36f6-4c49-8f87-15742c14a3e7";

fn extract(html: &str) -> Vec<ExtractedRecord> {
    TreeExtractor::new().extract(html, OWNER)
}

const RESULTS_PAGE: &str = r#"
<html>
  <head><title>rust scraper - Search</title></head>
  <body>
    <div id="header">
      <a href="/">Search</a>
      <ul class="tabs"><li>All</li><li>Images</li><li>News</li></ul>
    </div>
    <div id="results">
      <ol class="searchCenterMiddle">
        <li>
          <div class="compTitle">
            <h3><a href="https://docs.rs/scraper">scraper - Rust</a></h3>
            <div><span>docs.rs › scraper</span></div>
          </div>
          <div class="compText">
            <span class="fc-2nd">May 14, 2024</span>
            <p>HTML parsing and querying with CSS selectors.</p>
          </div>
        </li>
        <li>
          <div class="compTitle">
            <h3><a href="https://github.com/causal-agent/scraper">GitHub - causal-agent/scraper</a></h3>
            <div><span>github.com › causal-agent › scraper</span></div>
          </div>
          <div class="compText">
            <p>HTML parsing and querying with CSS selectors. Contribute on GitHub.</p>
          </div>
        </li>
        <li>
          <div class="compTitle"><span>www.reddit.com</span></div>
        </li>
      </ol>
    </div>
    <div id="footer"><p>Privacy</p><p>Terms</p></div>
  </body>
</html>
"#;

#[test]
fn test_results_page() {
    let records = extract(RESULTS_PAGE);

    assert_eq!(records.len(), 2);

    assert_eq!(records[0].url, "docs.rs › scraper");
    assert_eq!(records[0].date, "May 14, 2024");
    assert_eq!(
        records[0].body,
        "scraper - Rust HTML parsing and querying with CSS selectors."
    );

    assert_eq!(records[1].url, "github.com › causal-agent › scraper");
    assert_eq!(records[1].date, "");
    assert!(records[1].body.starts_with("GitHub - causal-agent/scraper"));
}

#[test]
fn test_two_items_sharing_a_list() {
    let html = r#"
        <ul>
          <li><a href="https://a.example.com">a.example.com</a><span>May 14, 2024</span><p>Body one</p></li>
          <li><a href="https://b.example.com">b.example.com</a><span>May 14, 2024</span><p>Body two</p></li>
        </ul>"#;

    let records = extract(html);
    let fields: Vec<_> = records.iter().map(ExtractedRecord::fields).collect();
    assert_eq!(
        fields,
        vec![
            ("a.example.com", "May 14, 2024", "Body one"),
            ("b.example.com", "May 14, 2024", "Body two"),
        ]
    );
}

#[test]
fn test_link_only_item_is_dropped() {
    let html = r#"<ul><li><a href="https://example.com">example.com</a></li></ul>"#;
    assert!(extract(html).is_empty());
}

#[test]
fn test_date_and_domain_inside_one_item() {
    let html = r#"
        <ol>
          <li>
            <span>Posted May 14, 2024</span>
            <span>mirrored at www.example.com</span>
            <p>What changed this release</p>
          </li>
          <li>
            <span>mirrored at www.example.org</span>
            <span>Posted Jan 2, 2020</span>
            <p>Older notes</p>
          </li>
        </ol>"#;

    let records = extract(html);
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].fields(),
        (
            "mirrored at www.example.com",
            "Posted May 14, 2024",
            "What changed this release"
        )
    );
    assert_eq!(
        records[1].fields(),
        ("mirrored at www.example.org", "Posted Jan 2, 2020", "Older notes")
    );
}

#[test]
fn test_empty_document() {
    assert!(extract("").is_empty());
    assert!(extract_groups(&Node::empty_document()).is_empty());
}

#[test]
fn test_second_date_in_group_is_dropped() {
    let html = r#"
        <ul><li>
          <span>May 14, 2024</span>
          <span>Updated June 1, 2024</span>
          <p>Body</p>
        </li></ul>"#;

    let records = extract(html);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].date, "May 14, 2024");
    assert_eq!(records[0].body, "Body");
    assert_eq!(records[0].url, "");
}

#[test]
fn test_every_record_has_two_fields() {
    for record in extract(RESULTS_PAGE) {
        let populated = [&record.url, &record.date, &record.body]
            .iter()
            .filter(|field| !field.is_empty())
            .count();
        assert!(populated >= 2, "{:?}", record);
    }
}

#[test]
fn test_output_bounded_by_distinct_identifiers_in_order() {
    let tree = Node::parse_html(RESULTS_PAGE);

    let mut seen = HashSet::new();
    let mut first_seen = Vec::new();
    for tagged in tag_tree(&tree) {
        if let Some(identifier) = tagged.group_identifier() {
            if seen.insert(identifier.clone()) {
                first_seen.push(identifier);
            }
        }
    }

    let groups = extract_groups(&tree);
    assert!(groups.len() <= first_seen.len());

    let positions: Vec<_> = groups
        .iter()
        .map(|g| first_seen.iter().position(|id| *id == g.identifier).unwrap())
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted);
}

#[test]
fn test_extraction_is_idempotent() {
    let first: Vec<_> = extract(RESULTS_PAGE)
        .iter()
        .map(|r| (r.url.clone(), r.date.clone(), r.body.clone()))
        .collect();
    let second: Vec<_> = extract(RESULTS_PAGE)
        .iter()
        .map(|r| (r.url.clone(), r.date.clone(), r.body.clone()))
        .collect();

    assert_eq!(first, second);
    assert_eq!(
        extract_groups(&Node::parse_html(RESULTS_PAGE)),
        extract_groups(&Node::parse_html(RESULTS_PAGE))
    );
}

#[test]
fn test_comments_keep_their_sibling_position() {
    let html = "<ul><!-- sponsored --><li><a>docs.rs</a><p>Crate docs</p></li></ul>";

    let groups = extract_groups(&Node::parse_html(html));
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].identifier, "html-body-ul-1_li");

    let records = extract(html);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].body, "Crate docs");
}
