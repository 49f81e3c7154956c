//! Filtering and sorting of the merged record view.
//!
//! [`project`] derives the sequence the view renders from the merged records
//! and the current [`Criteria`]. It is pure: no state, no I/O, the same input
//! always gives the same output, so it is simply re-run after every change to
//! the store or the criteria.
//!
//! # Filtering
//!
//! All clauses are ANDed and each is vacuously true when its criterion is
//! empty:
//!
//! - title contains `title_search` (case-insensitive)
//! - authors contain `author_search` (case-insensitive)
//!
//! Both text clauses use [`TermMatcher`], the same matcher the highlighter
//! uses, so a kept row always has something to highlight.
//! - year within `year_bounds`; records with an unknown year always pass
//!
//! # Sorting
//!
//! Sorting happens after filtering and is stable, so ties keep input order
//! (ingested before recommended when fed from [`RecordStore::merged`]).
//! Records with an unknown year sort last under both year orders.
//!
//! [`RecordStore::merged`]: crate::store::RecordStore::merged

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::highlight::TermMatcher;
use crate::models::Paper;

/// Sort order of the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Descending publication year
    #[default]
    Newest,
    /// Ascending publication year
    Oldest,
    /// Ascending by title
    Title,
    /// Keep input order; produced by unrecognized sort names
    Unsorted,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::Title => "title",
            SortKey::Unsorted => "unsorted",
        }
    }
}

impl From<&str> for SortKey {
    /// Parse a sort name. Unknown names map to [`SortKey::Unsorted`].
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "newest" => SortKey::Newest,
            "oldest" => SortKey::Oldest,
            "title" => SortKey::Title,
            _ => SortKey::Unsorted,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive publication year bounds, each side optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct YearBounds {
    /// Lower bound (inclusive)
    pub min: Option<i32>,

    /// Upper bound (inclusive)
    pub max: Option<i32>,
}

impl YearBounds {
    pub fn new(min: Option<i32>, max: Option<i32>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Whether a record's year passes the bounds. Unknown years always pass.
    pub fn admits(&self, year: Option<i32>) -> bool {
        let Some(year) = year else {
            return true;
        };
        self.min.map_or(true, |min| year >= min) && self.max.map_or(true, |max| year <= max)
    }
}

/// Current filter and sort settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Criteria {
    /// Case-insensitive substring of the title
    pub title_search: String,

    /// Case-insensitive substring of the authors
    pub author_search: String,

    pub year_bounds: YearBounds,

    pub sort_key: SortKey,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, term: impl Into<String>) -> Self {
        self.title_search = term.into();
        self
    }

    pub fn with_author(mut self, term: impl Into<String>) -> Self {
        self.author_search = term.into();
        self
    }

    pub fn with_year_min(mut self, year: i32) -> Self {
        self.year_bounds.min = Some(year);
        self
    }

    pub fn with_year_max(mut self, year: i32) -> Self {
        self.year_bounds.max = Some(year);
        self
    }

    pub fn with_sort(mut self, sort_key: SortKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    /// True when no filter clause is active (the sort key is not a filter).
    pub fn has_no_filters(&self) -> bool {
        self.title_search.is_empty() && self.author_search.is_empty() && self.year_bounds.is_unbounded()
    }

    /// The conjunction of all filter clauses.
    pub fn matches(&self, paper: &Paper) -> bool {
        Filter::new(self).matches(paper)
    }
}

/// Criteria with their text matchers built once per projection.
struct Filter<'c> {
    title: TermMatcher,
    author: TermMatcher,
    year_bounds: &'c YearBounds,
}

impl<'c> Filter<'c> {
    fn new(criteria: &'c Criteria) -> Self {
        Self {
            title: TermMatcher::new(&criteria.title_search),
            author: TermMatcher::new(&criteria.author_search),
            year_bounds: &criteria.year_bounds,
        }
    }

    fn matches(&self, paper: &Paper) -> bool {
        self.title.is_match(&paper.title)
            && self.author.is_match(paper.authors.as_deref().unwrap_or_default())
            && self.year_bounds.admits(paper.publication_year)
    }
}

/// Filter then stably sort `records` according to `criteria`.
pub fn project<'a, I>(records: I, criteria: &Criteria) -> Vec<&'a Paper>
where
    I: IntoIterator<Item = &'a Paper>,
{
    let filter = Filter::new(criteria);
    let mut out: Vec<&Paper> = records.into_iter().filter(|p| filter.matches(p)).collect();

    match criteria.sort_key {
        SortKey::Newest => out.sort_by(|a, b| by_year(a, b, true)),
        SortKey::Oldest => out.sort_by(|a, b| by_year(a, b, false)),
        SortKey::Title => out.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortKey::Unsorted => {}
    }

    out
}

/// Year ordering with unknown years after every known year.
fn by_year(a: &Paper, b: &Paper, descending: bool) -> Ordering {
    match (a.publication_year, b.publication_year) {
        (Some(x), Some(y)) if descending => y.cmp(&x),
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Title comparison for display ordering.
///
/// The primary key is the title folded to its NFKD form with combining marks
/// dropped and then lowercased, so "Étude" sorts with "etude" and before
/// "Fourier". Lowercase, then raw text break remaining ties. Surrounding
/// whitespace is ignored and empty titles sort first.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    let (ka, kb) = (a.trim(), b.trim());
    match (ka.is_empty(), kb.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    fold_title(ka)
        .cmp(&fold_title(kb))
        .then_with(|| ka.to_lowercase().cmp(&kb.to_lowercase()))
        .then_with(|| ka.cmp(kb))
}

fn fold_title(title: &str) -> String {
    title
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}
