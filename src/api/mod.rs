//! Backend boundary.
//!
//! The ingestion and recommendation backend is reached over HTTP. This module
//! defines the [`BackendApi`] trait the session talks to, the request and
//! response types, and the normalization that turns whatever JSON the backend
//! sends into record lists.
//!
//! Response decoding never fails on shape: a list may arrive bare or wrapped
//! (`{papers: [...]}`, `{results: [...]}`, `{result: {...}}`), and anything
//! unrecognized becomes an empty list. Only transport and HTTP status failures
//! surface as [`ApiError`].

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::Paper;

/// Errors that can occur while talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, timeout or other transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status
    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be read
    #[error("Failed to read response: {0}")]
    Decode(String),

    /// The configured base URL is not usable
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP client could not be built
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for backend operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Request for the ingest endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    /// Search query forwarded to the upstream paper source
    pub query: String,

    /// Maximum number of papers to pull in
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl IngestRequest {
    pub fn new(query: impl Into<String>, max_results: Option<usize>) -> Self {
        Self {
            query: query.into(),
            max_results: max_results.unwrap_or_else(default_max_results),
        }
    }
}

fn default_max_results() -> usize {
    crate::DEFAULT_MAX_RESULTS
}

/// Response of the ingest endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IngestResponse {
    /// Number of papers the backend newly stored
    pub added_count: usize,

    /// Records returned with the response, if the backend sent any
    pub records: Option<Vec<Paper>>,
}

impl IngestResponse {
    /// Normalize an ingest response body.
    ///
    /// Accepts `{addedCount, records}`, `{added_count, papers}`,
    /// `{status, result: {fetched, inserted}}` and similar spellings.
    pub fn from_value(value: &Value) -> Self {
        let body = unwrap_result(value);

        let records = record_array(body, &["records", "papers"])
            .or_else(|| record_array(value, &["records", "papers"]))
            .map(|items| papers_from_array(items));

        let added_count = ["addedCount", "added_count", "inserted", "added"]
            .iter()
            .find_map(|k| body.get(*k).or_else(|| value.get(*k)).and_then(Value::as_u64))
            .map(|n| n as usize)
            .or_else(|| records.as_ref().map(Vec::len))
            .unwrap_or(0);

        Self { added_count, records }
    }
}

/// Request for the recommend endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    /// Free-text topic or description
    pub query: String,

    /// Number of recommendations wanted
    #[serde(default = "default_k")]
    pub k: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl RecommendRequest {
    pub fn new(query: impl Into<String>, k: Option<usize>) -> Self {
        Self {
            query: query.into(),
            k: k.unwrap_or_else(default_k),
            year_min: None,
            year_max: None,
            author: None,
        }
    }

    pub fn with_years(mut self, year_min: Option<i32>, year_max: Option<i32>) -> Self {
        self.year_min = year_min;
        self.year_max = year_max;
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author.filter(|a| !a.trim().is_empty());
        self
    }
}

fn default_k() -> usize {
    crate::DEFAULT_RECOMMEND_K
}

/// Response of the recommend endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecommendResponse {
    pub results: Vec<Paper>,
}

impl RecommendResponse {
    /// Normalize a recommend response body: `{results}`, a bare array, or
    /// `{papers}`.
    pub fn from_value(value: &Value) -> Self {
        Self {
            results: papers_from_value(value, &["results", "papers"]),
        }
    }
}

/// Trait for the remote backend.
///
/// Implementations perform exactly one request per call; retrying is left to
/// the user.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Fetch the initial list of stored papers.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of papers to return
    async fn list_papers(&self, limit: usize) -> ApiResult<Vec<Paper>>;

    /// Ask the backend to ingest papers matching a query.
    async fn ingest(&self, request: &IngestRequest) -> ApiResult<IngestResponse>;

    /// Ask the backend for papers related to a query.
    async fn recommend(&self, request: &RecommendRequest) -> ApiResult<RecommendResponse>;

    /// Human-readable backend description for logging.
    fn name(&self) -> &str;
}

/// Extract a record list from a bare array or from the first matching key of
/// a wrapper object (looking through a `result`/`data` envelope as well).
/// Unrecognized shapes give an empty list.
pub fn papers_from_value(value: &Value, keys: &[&str]) -> Vec<Paper> {
    if let Value::Array(items) = value {
        return papers_from_array(items);
    }
    let inner = unwrap_result(value);
    if let Value::Array(items) = inner {
        return papers_from_array(items);
    }
    record_array(value, keys)
        .or_else(|| record_array(inner, keys))
        .map(|items| papers_from_array(items))
        .unwrap_or_default()
}

fn papers_from_array(items: &[Value]) -> Vec<Paper> {
    items.iter().filter_map(Paper::from_value).collect()
}

fn record_array<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|k| value.get(*k).and_then(Value::as_array))
}

/// Step into a `result` or `data` envelope when one is present.
fn unwrap_result(value: &Value) -> &Value {
    ["result", "data"]
        .iter()
        .find_map(|k| value.get(*k).filter(|v| v.is_object() || v.is_array()))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_accepts_bare_and_wrapped_arrays() {
        let bare = json!([{"id": 1, "title": "A"}, {"id": 2, "title": "B"}]);
        let wrapped = json!({"count": 2, "papers": [{"id": 1, "title": "A"}, {"id": 2, "title": "B"}]});

        assert_eq!(papers_from_value(&bare, &["papers"]).len(), 2);
        assert_eq!(papers_from_value(&wrapped, &["papers"]).len(), 2);
    }

    #[test]
    fn test_unrecognized_shapes_give_empty_list() {
        for value in [json!(null), json!("oops"), json!(42), json!({"items": []}), json!({"papers": "x"})] {
            assert!(papers_from_value(&value, &["papers"]).is_empty(), "{}", value);
        }
    }

    #[test]
    fn test_non_object_items_are_skipped() {
        let value = json!([{"id": 1, "title": "A"}, 3, "x", null]);
        assert_eq!(papers_from_value(&value, &[]).len(), 1);
    }

    #[test]
    fn test_ingest_response_with_records() {
        let resp = IngestResponse::from_value(&json!({
            "addedCount": 1,
            "records": [{"id": 1, "title": "A"}, {"id": 2, "title": "B"}]
        }));
        assert_eq!(resp.added_count, 1);
        assert_eq!(resp.records.unwrap().len(), 2);
    }

    #[test]
    fn test_ingest_response_status_result_shape() {
        let resp = IngestResponse::from_value(&json!({
            "status": "success",
            "result": {"fetched": 5, "inserted": 3}
        }));
        assert_eq!(resp.added_count, 3);
        assert!(resp.records.is_none());
    }

    #[test]
    fn test_ingest_response_count_defaults_to_records() {
        let resp = IngestResponse::from_value(&json!({"papers": [{"id": 1}]}));
        assert_eq!(resp.added_count, 1);

        let empty = IngestResponse::from_value(&json!("done"));
        assert_eq!(empty, IngestResponse::default());
    }

    #[test]
    fn test_recommend_response_shapes() {
        let wrapped = RecommendResponse::from_value(&json!({"results": [{"title": "A", "url": "u"}]}));
        let bare = RecommendResponse::from_value(&json!([{"title": "A"}, {"title": "B"}]));
        let junk = RecommendResponse::from_value(&json!({"detail": "Not Found"}));

        assert_eq!(wrapped.results.len(), 1);
        assert_eq!(wrapped.results[0].id.as_str(), "~url:u");
        assert_eq!(bare.results.len(), 2);
        assert!(junk.results.is_empty());
    }

    #[test]
    fn test_recommend_request_serialization() {
        let req = RecommendRequest::new("graphs", None)
            .with_years(Some(2018), None)
            .with_author(Some("  ".to_string()));
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value, json!({"query": "graphs", "k": 5, "yearMin": 2018}));
    }

    #[test]
    fn test_ingest_request_defaults() {
        let req = IngestRequest::new("machine learning", None);
        assert_eq!(req.max_results, crate::DEFAULT_MAX_RESULTS);
    }
}
