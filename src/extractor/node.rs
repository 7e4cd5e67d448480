//! Document tree consumed by the tagger
//!
//! The extractor never looks at raw markup. `Node::parse_html` adapts the
//! `scraper` (html5ever) DOM into this two-variant tree; everything after that
//! works on `Node` alone, so callers with their own parser can build trees
//! directly.

use scraper::{ElementRef, Html};

/// Tag name given to the synthetic root of a parsed document
pub const DOCUMENT_TAG: &str = "#document";

/// A node in a parsed document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A text leaf
    Text { value: String },

    /// An element with its children in document order
    Element {
        tag_name: String,
        children: Vec<Node>,
    },
}

impl Node {
    /// Create a text leaf
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text {
            value: value.into(),
        }
    }

    /// Create an element node
    pub fn element(tag_name: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element {
            tag_name: tag_name.into(),
            children,
        }
    }

    /// An empty document
    pub fn empty_document() -> Self {
        Node::element(DOCUMENT_TAG, Vec::new())
    }

    /// Tag name of an element, `None` for text leaves
    pub fn tag_name(&self) -> Option<&str> {
        match self {
            Node::Element { tag_name, .. } => Some(tag_name),
            Node::Text { .. } => None,
        }
    }

    /// Parse an HTML document into a tree rooted at a `#document` element.
    ///
    /// html5ever recovers from malformed markup, so this never fails. A comment
    /// becomes an empty text node so it still occupies its sibling position;
    /// doctypes and processing instructions are dropped.
    pub fn parse_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        Node::element(DOCUMENT_TAG, vec![from_element(document.root_element())])
    }
}

fn from_element(element: ElementRef<'_>) -> Node {
    let children = element
        .children()
        .filter_map(|child| match child.value() {
            scraper::Node::Text(text) => Some(Node::text(text.to_string())),
            scraper::Node::Element(_) => ElementRef::wrap(child).map(from_element),
            scraper::Node::Comment(_) => Some(Node::text(String::new())),
            _ => None,
        })
        .collect();

    Node::element(element.value().name(), children)
}
