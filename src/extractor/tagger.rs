//! Tree tagging: flatten a document into text fragments annotated with their
//! ancestor path.

use super::node::Node;
use serde::Serialize;
use std::fmt;

/// Separator used when rendering a path prefix as a group identifier
pub const PATH_SEPARATOR: &str = "-";

/// An ancestor label in a tag path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Label {
    /// Plain tag name
    Tag(String),

    /// Direct child of an `ul`/`ol` container, rendered as `{index}_{tag}`
    Marker { index: usize, tag: String },
}

impl Label {
    /// Whether this label marks a list-item boundary
    pub fn is_marker(&self) -> bool {
        matches!(self, Label::Marker { .. })
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Tag(tag) => f.write_str(tag),
            Label::Marker { index, tag } => write!(f, "{}_{}", index, tag),
        }
    }
}

/// A non-empty text fragment with the labels of its ancestors, root to leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedText {
    pub tag_path: Vec<Label>,
    pub text: String,
}

impl TaggedText {
    /// Whether any ancestor is a list item
    pub fn has_marker(&self) -> bool {
        self.tag_path.iter().any(Label::is_marker)
    }

    /// Path labels up to and including the first marker, joined with `-`.
    ///
    /// Returns `None` when the path carries no marker.
    pub fn group_identifier(&self) -> Option<String> {
        let end = self.tag_path.iter().position(Label::is_marker)?;
        Some(
            self.tag_path[..=end]
                .iter()
                .map(Label::to_string)
                .collect::<Vec<_>>()
                .join(PATH_SEPARATOR),
        )
    }
}

fn is_list_container(tag_name: &str) -> bool {
    tag_name.eq_ignore_ascii_case("ul") || tag_name.eq_ignore_ascii_case("ol")
}

/// Label for the child at `child_index` of an element named `parent_tag`
pub fn label_for(parent_tag: &str, child_index: usize, child_tag: &str) -> Label {
    if is_list_container(parent_tag) {
        Label::Marker {
            index: child_index,
            tag: child_tag.to_string(),
        }
    } else {
        Label::Tag(child_tag.to_string())
    }
}

/// Walk `root` depth-first and emit every non-whitespace text leaf in
/// document order. The root's own tag never appears in a path.
pub fn tag_tree(root: &Node) -> Vec<TaggedText> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(root, &mut path, &mut out);
    out
}

fn walk(node: &Node, path: &mut Vec<Label>, out: &mut Vec<TaggedText>) {
    match node {
        Node::Text { value } => {
            let text = value.trim();
            if !text.is_empty() {
                out.push(TaggedText {
                    tag_path: path.clone(),
                    text: text.to_string(),
                });
            }
        }
        Node::Element { tag_name, children } => {
            for (index, child) in children.iter().enumerate() {
                match child.tag_name() {
                    Some(child_tag) => {
                        path.push(label_for(tag_name, index, child_tag));
                        walk(child, path, out);
                        path.pop();
                    }
                    None => walk(child, path, out),
                }
            }
        }
    }
}
