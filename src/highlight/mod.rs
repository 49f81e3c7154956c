//! Search-term highlighting.
//!
//! [`highlight`] splits a piece of text into alternating matched and unmatched
//! [`Segment`]s for a user-typed search term. The term is always treated as a
//! literal: it is escaped before the matcher is built, and if a matcher still
//! cannot be built the whole text comes back as one unmatched segment.
//!
//! Concatenating the returned segments always reproduces the input exactly.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::warn;

/// A contiguous run of text, marked as a search match or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    pub matched: bool,
}

impl Segment {
    pub fn matched(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            matched: true,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            matched: false,
        }
    }
}

/// Case-insensitive literal matcher for one search term.
///
/// The title and author filters and the highlighter both go through this
/// type, so a row the filter keeps always shows a highlighted match and the
/// other way round.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    term: String,
    regex: Option<Regex>,
}

impl TermMatcher {
    pub fn new(term: &str) -> Self {
        let regex = if term.is_empty() {
            None
        } else {
            match RegexBuilder::new(&regex::escape(term)).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Could not build matcher for {:?}: {}", term, e);
                    None
                }
            }
        };
        Self {
            term: term.to_string(),
            regex,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }

    /// Whether `text` contains the term. An empty term matches everything.
    ///
    /// Falls back to lowercase containment if no matcher could be built.
    pub fn is_match(&self, text: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(text),
            None => self.term.is_empty() || text.to_lowercase().contains(&self.term.to_lowercase()),
        }
    }

    /// Split `text` into alternating matched and unmatched segments.
    pub fn segments(&self, text: &str) -> Vec<Segment> {
        let Some(matcher) = self.regex.as_ref().filter(|_| !text.is_empty()) else {
            return vec![Segment::plain(text)];
        };

        let mut segments = Vec::new();
        let mut cursor = 0;
        for m in matcher.find_iter(text) {
            if m.start() > cursor {
                segments.push(Segment::plain(&text[cursor..m.start()]));
            }
            segments.push(Segment::matched(m.as_str()));
            cursor = m.end();
        }
        if cursor < text.len() || segments.is_empty() {
            segments.push(Segment::plain(&text[cursor..]));
        }

        segments
    }
}

/// Split `text` into segments around case-insensitive occurrences of `term`.
///
/// An empty term yields a single unmatched segment equal to `text`.
pub fn highlight(text: &str, term: &str) -> Vec<Segment> {
    TermMatcher::new(term).segments(text)
}

/// Highlight an optional field; absent text highlights as the empty string.
pub fn highlight_opt(text: Option<&str>, term: &str) -> Vec<Segment> {
    highlight(text.unwrap_or_default(), term)
}

/// Whether any segment is a match.
pub fn has_match(segments: &[Segment]) -> bool {
    segments.iter().any(|s| s.matched)
}
