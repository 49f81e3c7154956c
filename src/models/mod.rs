//! Core data models for the paper browser.
//!
//! A [`Paper`] is the single record shape shared by every part of the client:
//! the backend responses decode into it, the store holds it, the query pipeline
//! filters and sorts it, and the view renders it.
//!
//! Backend payloads are not uniform (different endpoints use `year` or
//! `publication_year`, `abstract` or `abstractText`, integer or string ids, and
//! some omit the id entirely), so decoding goes through [`Paper::from_value`],
//! which accepts every known spelling and never fails on a missing field.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Opaque, stable identity of a paper.
///
/// Two records with equal ids are the same entity even if their other fields
/// differ between fetches. Backend ids are kept verbatim; ids derived for
/// records that arrive without one carry a `~` prefix so they can never collide
/// with a backend-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build an id from a JSON scalar (integer or string).
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    fn derived(kind: &str, key: &str) -> Self {
        Self(format!("~{}:{}", kind, key))
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaperId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PaperId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i32> for PaperId {
    fn from(id: i32) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for PaperId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// A research paper record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    /// Identity key used for list rendering and selection
    pub id: PaperId,

    /// Paper title; an absent upstream title is stored as the empty string
    pub title: String,

    /// Free-form author list ("A, B and C")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,

    /// Year of publication, `None` when unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,

    /// Abstract text, shown only in the detail view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,

    /// External link to the paper
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// arXiv identifier, when the backend reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arxiv_id: Option<String>,
}

impl Paper {
    /// Create a paper with only an id and a title set.
    pub fn new(id: impl Into<PaperId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: None,
            publication_year: None,
            abstract_text: None,
            source_url: None,
            arxiv_id: None,
        }
    }

    pub fn with_authors(mut self, authors: impl Into<String>) -> Self {
        self.authors = Some(authors.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.publication_year = Some(year);
        self
    }

    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = Some(abstract_text.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Authors for display, `"Unknown"` when absent or blank.
    pub fn display_authors(&self) -> &str {
        match self.authors.as_deref() {
            Some(a) if !a.trim().is_empty() => a,
            _ => "Unknown",
        }
    }

    /// Publication year for display, `"N/A"` when unknown.
    pub fn display_year(&self) -> String {
        self.publication_year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }

    /// Decode a paper from one JSON object of any known backend shape.
    ///
    /// Returns `None` only when `value` is not an object. Missing or
    /// mistyped fields degrade to their empty/unknown form.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let title = text_field(obj, &["title"]).unwrap_or_default();
        let arxiv_id = text_field(obj, &["arxiv_id", "arxivId"]);
        let source_url = text_field(obj, &["sourceUrl", "source_url", "url"]);

        let id = field(obj, &["id", "paper_id", "paperId"])
            .and_then(PaperId::from_json)
            .or_else(|| arxiv_id.as_deref().map(|a| PaperId::derived("arxiv", a)))
            .or_else(|| source_url.as_deref().map(|u| PaperId::derived("url", u)))
            .unwrap_or_else(|| PaperId::derived("title", &title));

        Some(Self {
            id,
            title,
            authors: field(obj, &["authors", "author"]).and_then(authors_from_json),
            publication_year: field(obj, &["publicationYear", "publication_year", "year", "published"])
                .and_then(year_from_json),
            abstract_text: text_field(obj, &["abstractText", "abstract_text", "abstract", "summary"]),
            source_url,
            arxiv_id,
        })
    }
}

impl<'de> Deserialize<'de> for Paper {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Paper::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("paper record must be a JSON object"))
    }
}

/// First non-null value among the given key spellings.
fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match field(obj, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Authors arrive as a joined string, a list of names, or a list of
/// `{name, affiliation}` objects.
fn authors_from_json(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let names: Vec<&str> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(o) => o.get("name").and_then(Value::as_str),
                    _ => None,
                })
                .collect();
            if names.is_empty() {
                None
            } else {
                Some(names.join(", "))
            }
        }
        _ => None,
    }
}

/// Years arrive as integers, numeric strings, or ISO dates ("2020-05-01").
fn year_from_json(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().split('-').next()?.trim().parse().ok(),
        _ => None,
    }
}
