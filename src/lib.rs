//! Paper Browser - a terminal client for a research-paper recommender.
//!
//! The client fills a working set of paper records from two sources, bulk
//! ingestion and query-driven recommendation, and lets the user browse the
//! combined set by filtering, sorting, highlighting and opening details.
//! Ingestion and ranking happen in a separate backend reached over HTTP.
//!
//! # Architecture
//!
//! - **models**: The `Paper` record and its lenient JSON decoding
//! - **highlight**: Splits text into matched/unmatched segments for a search term
//! - **store**: Two independently replaced partitions (ingested, recommended)
//! - **query**: Pure filter + stable sort of the merged records
//! - **selection**: The detail-view selection, resolved by id on every read
//! - **api**: Backend trait, request/response types, reqwest implementation
//! - **session**: Dispatches user intents to the store, criteria and backend
//! - **view**: Table/detail rendering and the interactive command grammar
//!
//! # Data flow
//!
//! 1. An intent (ingest, recommend, filter change, open/close) reaches the session
//! 2. Backend answers replace one store partition wholesale
//! 3. The selection is re-resolved; a vanished record closes the detail view
//! 4. `query::project` derives the visible list from the merged records
//! 5. The view renders it, highlighting active search terms
//!
//! # Example
//!
//! ```ignore
//! use paper_browser::{
//!     api::{http::{BackendConfig, HttpBackend}, RecommendRequest},
//!     query::SortKey,
//!     session::Session,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = HttpBackend::new(BackendConfig::default())?;
//!     let mut session = Session::new(backend, 20);
//!
//!     println!("{}", session.load_initial().await);
//!     println!("{}", session.submit_recommend(RecommendRequest::new("graph networks", None)).await);
//!
//!     session.set_sort_key(SortKey::Oldest);
//!     for paper in session.visible() {
//!         println!("{} ({})", paper.title, paper.display_year());
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod highlight;
pub mod models;
pub mod query;
pub mod selection;
pub mod session;
pub mod store;
pub mod view;

// Re-export commonly used types at the crate root
pub use api::{ApiError, BackendApi, IngestRequest, RecommendRequest};
pub use highlight::{highlight, Segment, TermMatcher};
pub use models::{Paper, PaperId};
pub use query::{project, Criteria, SortKey, YearBounds};
pub use selection::Selection;
pub use session::{Notice, Session};
pub use store::{Partition, RecordStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default backend address
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

/// Number of papers requested by the initial list load
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Default number of papers pulled in by one ingest
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Default number of recommendations requested
pub const DEFAULT_RECOMMEND_K: usize = 5;
