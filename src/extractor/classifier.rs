//! Heuristic classification of a text fragment as date, url or body.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// `May 14, 2024`, `Sep 3, 1999`, `January 1, 2020`
static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:tember)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\s\d{1,2},\s\d{4}\b",
    )
    .expect("date pattern is valid")
});

/// `www.example.com`, `docs.rs`, `en.wikipedia.org`
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:www\.)?[\w-]+\.(?:[\w-]+\.)?[a-zA-Z]{2,6}\b").expect("url pattern is valid")
});

/// Separator search engines render between breadcrumb segments of a result url
pub const BREADCRUMB_SEPARATOR: &str = "› ";

/// Which field of a search result a fragment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextClass {
    Date,
    Url,
    Body,
}

/// Whether `text` contains a `Month D, YYYY` date
pub fn is_date(text: &str) -> bool {
    DATE_PATTERN.is_match(text)
}

/// Whether `text` contains a domain-like token or a breadcrumb separator
pub fn is_url(text: &str) -> bool {
    URL_PATTERN.is_match(text) || text.contains(BREADCRUMB_SEPARATOR)
}

/// Classify a fragment. Dates are checked before urls.
pub fn classify(text: &str) -> TextClass {
    if is_date(text) {
        TextClass::Date
    } else if is_url(text) {
        TextClass::Url
    } else {
        TextClass::Body
    }
}
