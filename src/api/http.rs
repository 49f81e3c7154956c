//! HTTP backend implementation.
//!
//! Talks to the recommender backend with `reqwest`. Endpoints:
//!
//! - `GET  /papers?limit=N`
//! - `POST /ingest_arxiv?query=Q&max_results=N`
//! - `POST /recommend?query=Q&k=K` with a JSON body carrying the same fields
//!   plus the optional filters

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    papers_from_value, ApiError, ApiResult, BackendApi, IngestRequest, IngestResponse,
    RecommendRequest, RecommendResponse,
};
use crate::models::Paper;

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend, e.g. `http://127.0.0.1:8000`
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// User-Agent header value
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: crate::DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
            user_agent: format!("paper-browser/{}", crate::VERSION),
        }
    }
}

/// Backend reached over HTTP.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    name: String,
}

impl HttpBackend {
    /// Create a backend client.
    ///
    /// # Errors
    /// Returns `ApiError::InvalidUrl` if `config.base_url` does not parse as an
    /// http(s) URL, or `ApiError::Config` if the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> ApiResult<Self> {
        let trimmed = config.base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(&format!("{}/", trimmed))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                config.base_url
            )));
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent);
        // Local backends are never reached through a system proxy.
        if matches!(base_url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]")) {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            name: format!("http backend at {}", trimmed),
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Send a request and parse its body as JSON.
    ///
    /// A body that is not JSON is logged and treated as `null`, which the
    /// shape normalizers turn into an empty result.
    async fn send_json(&self, request: RequestBuilder) -> ApiResult<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Backend sent a non-JSON body ({}); treating it as empty", e);
                Ok(Value::Null)
            }
        }
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn list_papers(&self, limit: usize) -> ApiResult<Vec<Paper>> {
        let url = self.endpoint("papers")?;
        debug!("GET {} limit={}", url, limit);

        let value = self
            .send_json(self.client.get(url).query(&[("limit", limit)]))
            .await?;
        Ok(papers_from_value(&value, &["papers", "results", "records"]))
    }

    async fn ingest(&self, request: &IngestRequest) -> ApiResult<IngestResponse> {
        let url = self.endpoint("ingest_arxiv")?;
        debug!("POST {} query={:?} max_results={}", url, request.query, request.max_results);

        let max_results = request.max_results.to_string();
        let value = self
            .send_json(self.client.post(url).query(&[
                ("query", request.query.as_str()),
                ("max_results", max_results.as_str()),
            ]))
            .await?;
        Ok(IngestResponse::from_value(&value))
    }

    async fn recommend(&self, request: &RecommendRequest) -> ApiResult<RecommendResponse> {
        let url = self.endpoint("recommend")?;
        debug!("POST {} query={:?} k={}", url, request.query, request.k);

        let mut body = serde_json::to_value(request)
            .map_err(|e| ApiError::Decode(format!("Failed to encode request: {}", e)))?;
        if let Value::Object(map) = &mut body {
            map.insert("text".to_string(), Value::String(request.query.clone()));
        }

        let k = request.k.to_string();
        let value = self
            .send_json(
                self.client
                    .post(url)
                    .query(&[("query", request.query.as_str()), ("k", k.as_str())])
                    .json(&body),
            )
            .await?;
        Ok(RecommendResponse::from_value(&value))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned response and hand back the raw request text.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];

            // Read headers, then exactly Content-Length bytes of body.
            let header_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if let Some(pos) = find(&raw, b"\r\n\r\n") {
                    break pos + 4;
                }
                if n == 0 {
                    break raw.len();
                }
            };
            let headers = String::from_utf8_lossy(&raw[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while raw.len() < header_end + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn backend(base_url: String) -> HttpBackend {
        HttpBackend::new(BackendConfig {
            base_url,
            timeout_secs: 5,
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let err = HttpBackend::new(BackendConfig {
            base_url: "not a url".to_string(),
            ..BackendConfig::default()
        });
        assert!(matches!(err, Err(ApiError::InvalidUrl(_))));

        let err = HttpBackend::new(BackendConfig {
            base_url: "ftp://example.com".to_string(),
            ..BackendConfig::default()
        });
        assert!(matches!(err, Err(ApiError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_list_papers_wrapped() {
        let (base, server) =
            serve_once("200 OK", r#"{"count": 2, "papers": [{"id": 1, "title": "A", "year": 2020}, {"id": 2, "title": "B"}]}"#).await;

        let papers = backend(base).list_papers(20).await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("GET /papers?limit=20 "));
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].publication_year, Some(2020));
    }

    #[tokio::test]
    async fn test_list_papers_non_json_is_empty() {
        let (base, server) = serve_once("200 OK", "<html>oops</html>").await;
        let papers = backend(base).list_papers(5).await.unwrap();
        server.await.unwrap();
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_sends_query_params() {
        let (base, server) =
            serve_once("200 OK", r#"{"status": "success", "result": {"fetched": 4, "inserted": 2}}"#).await;

        let resp = backend(base)
            .ingest(&IngestRequest::new("graph networks", Some(4)))
            .await
            .unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("POST /ingest_arxiv?query=graph+networks&max_results=4 "));
        assert_eq!(resp.added_count, 2);
        assert!(resp.records.is_none());
    }

    #[tokio::test]
    async fn test_recommend_sends_body_and_parses_results() {
        let (base, server) =
            serve_once("200 OK", r#"{"results": [{"title": "A", "url": "http://x/a", "abstract": "..."}]}"#).await;

        let req = RecommendRequest::new("transformers", Some(3)).with_years(Some(2019), Some(2021));
        let resp = backend(base).recommend(&req).await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("POST /recommend?query=transformers&k=3 "));
        assert!(request.contains(r#""text":"transformers""#));
        assert!(request.contains(r#""yearMin":2019"#));
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].source_url.as_deref(), Some("http://x/a"));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (base, server) = serve_once("500 Internal Server Error", r#"{"detail": "boom"}"#).await;

        let err = backend(base).list_papers(20).await.unwrap_err();
        server.await.unwrap();

        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("Expected Status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = backend(format!("http://{}", addr)).list_papers(20).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}
