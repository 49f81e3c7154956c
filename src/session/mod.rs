//! Browsing session: the place where user intents meet state.
//!
//! A [`Session`] owns the record store, the filter/sort criteria and the
//! detail selection, plus the backend used to fill the store. Every intent is
//! a method: the ones that talk to the backend are `async` and settle with a
//! one-line [`Notice`] for the user; the rest are synchronous.
//!
//! Each partition's loading flag gates its requests. While a partition is
//! loading, a second submission for it is refused with [`Notice::Busy`] and
//! no request is sent. Backend failures leave the partition untouched, clear
//! the flag, and come back as [`Notice::Failed`]; nothing here is fatal.

use std::fmt;

use tracing::{debug, info, warn};

use crate::api::{BackendApi, IngestRequest, RecommendRequest};
use crate::models::{Paper, PaperId};
use crate::query::{project, Criteria, SortKey, YearBounds};
use crate::selection::Selection;
use crate::store::{Partition, RecordStore};

/// Backend-facing user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Load,
    Ingest,
    Recommend,
}

impl Action {
    /// The partition an action fills.
    pub fn partition(&self) -> Partition {
        match self {
            Action::Load | Action::Ingest => Partition::Ingested,
            Action::Recommend => Partition::Recommended,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Load => "load papers",
            Action::Ingest => "ingest papers",
            Action::Recommend => "get recommendations",
        })
    }
}

/// User-visible outcome of a backend action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Loaded { count: usize },
    Ingested { added: usize },
    Recommended { count: usize },
    Busy { action: Action },
    Failed { action: Action, reason: String },
}

impl Notice {
    pub fn is_failure(&self) -> bool {
        matches!(self, Notice::Failed { .. } | Notice::Busy { .. })
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Loaded { count } => write!(f, "Loaded {} papers", count),
            Notice::Ingested { added } => write!(f, "{} new papers ingested", added),
            Notice::Recommended { count } => write!(f, "{} recommendations", count),
            Notice::Busy { action } => {
                write!(f, "Still waiting on the previous request; cannot {} yet", action)
            }
            Notice::Failed { action, reason } => write!(f, "Failed to {}: {}", action, reason),
        }
    }
}

/// Store, criteria and selection for one browsing session.
pub struct Session<B: BackendApi> {
    backend: B,
    store: RecordStore,
    criteria: Criteria,
    selection: Selection,
    list_limit: usize,
}

impl<B: BackendApi> Session<B> {
    /// Create an empty session.
    ///
    /// # Arguments
    /// * `backend` - Backend used for list/ingest/recommend requests
    /// * `list_limit` - Number of papers requested when (re)loading the list
    pub fn new(backend: B, list_limit: usize) -> Self {
        Self {
            backend,
            store: RecordStore::new(),
            criteria: Criteria::default(),
            selection: Selection::new(),
            list_limit,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The filtered, sorted view of the merged records.
    pub fn visible(&self) -> Vec<&Paper> {
        project(self.store.merged(), &self.criteria)
    }

    // ------------------------------------------------------------------
    // Criteria intents
    // ------------------------------------------------------------------

    pub fn set_title_search(&mut self, term: impl Into<String>) {
        self.criteria.title_search = term.into();
    }

    pub fn set_author_search(&mut self, term: impl Into<String>) {
        self.criteria.author_search = term.into();
    }

    pub fn set_year_bounds(&mut self, bounds: YearBounds) {
        self.criteria.year_bounds = bounds;
    }

    pub fn set_sort_key(&mut self, sort_key: SortKey) {
        self.criteria.sort_key = sort_key;
    }

    pub fn set_criteria(&mut self, criteria: Criteria) {
        self.criteria = criteria;
    }

    pub fn reset_criteria(&mut self) {
        self.criteria = Criteria::default();
    }

    // ------------------------------------------------------------------
    // Selection intents
    // ------------------------------------------------------------------

    /// Open the detail view for `id`. Returns `false` (and stays closed) when
    /// no record with that id is loaded.
    pub fn select(&mut self, id: PaperId) -> bool {
        self.selection.select(id);
        self.current().is_some()
    }

    pub fn close_detail(&mut self) {
        self.selection.clear();
    }

    /// The record open in the detail view, resolved against the live store.
    pub fn current(&mut self) -> Option<&Paper> {
        self.selection.current(&self.store)
    }

    // ------------------------------------------------------------------
    // Backend intents
    // ------------------------------------------------------------------
    //
    // Each holds its partition's loading flag through a `Loading` guard, so
    // cancelling one of these futures never leaves the partition busy.

    /// Load the initial paper list into the ingested partition.
    pub async fn load_initial(&mut self) -> Notice {
        let loading = match Loading::start(&mut self.store, Action::Load) {
            Ok(loading) => loading,
            Err(busy) => return busy,
        };
        match self.backend.list_papers(self.list_limit).await {
            Ok(papers) => {
                let count = papers.len();
                loading.settle(papers, &mut self.selection);
                info!("Loaded {} papers", count);
                Notice::Loaded { count }
            }
            Err(e) => loading.fail(self.backend.name(), e),
        }
    }

    /// Ingest papers for `query` and refresh the ingested partition.
    ///
    /// When the backend answers without records, the list endpoint is asked
    /// again so the partition reflects what was stored.
    pub async fn submit_ingest(&mut self, request: IngestRequest) -> Notice {
        let loading = match Loading::start(&mut self.store, Action::Ingest) {
            Ok(loading) => loading,
            Err(busy) => return busy,
        };
        debug!("Ingesting {:?} (max {})", request.query, request.max_results);

        let response = match self.backend.ingest(&request).await {
            Ok(response) => response,
            Err(e) => return loading.fail(self.backend.name(), e),
        };
        let added = response.added_count;

        let records = match response.records {
            Some(records) => records,
            None => match self.backend.list_papers(self.list_limit).await {
                Ok(papers) => papers,
                Err(e) => {
                    // The ingest itself succeeded; keep the old list.
                    warn!("Ingest succeeded but the list refresh failed: {}", e);
                    return Notice::Ingested { added };
                }
            },
        };

        loading.settle(records, &mut self.selection);
        info!("Ingested {} new papers", added);
        Notice::Ingested { added }
    }

    /// Replace the recommended partition with results for `request`.
    pub async fn submit_recommend(&mut self, request: RecommendRequest) -> Notice {
        let loading = match Loading::start(&mut self.store, Action::Recommend) {
            Ok(loading) => loading,
            Err(busy) => return busy,
        };
        debug!("Requesting {} recommendations for {:?}", request.k, request.query);

        match self.backend.recommend(&request).await {
            Ok(response) => {
                let count = response.results.len();
                loading.settle(response.results, &mut self.selection);
                info!("Received {} recommendations", count);
                Notice::Recommended { count }
            }
            Err(e) => loading.fail(self.backend.name(), e),
        }
    }
}

/// An in-flight request holding its partition's loading flag.
///
/// The flag is cleared on drop, whether the request settled, failed, or its
/// future was dropped before completing.
struct Loading<'a> {
    store: &'a mut RecordStore,
    action: Action,
}

impl<'a> Loading<'a> {
    /// Mark `action`'s partition as loading, unless it already is.
    fn start(store: &'a mut RecordStore, action: Action) -> Result<Self, Notice> {
        let partition = action.partition();
        if store.is_loading(partition) {
            warn!("Refusing to {}: {} partition is still loading", action, partition);
            return Err(Notice::Busy { action });
        }
        store.set_loading(partition, true);
        Ok(Self { store, action })
    }

    /// Replace the partition and re-resolve the selection against it.
    fn settle(mut self, records: Vec<Paper>, selection: &mut Selection) {
        let partition = self.action.partition();
        self.store.replace_partition(partition, records);
        if selection.reconcile(&*self.store) {
            info!("Selected paper left the {} partition; detail view closed", partition);
        }
    }

    fn fail(self, backend: &str, reason: impl fmt::Display) -> Notice {
        warn!("Failed to {} via {}: {}", self.action, backend, reason);
        Notice::Failed {
            action: self.action,
            reason: reason.to_string(),
        }
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.store.set_loading(self.action.partition(), false);
    }
}
