//! Detail-view selection.
//!
//! The selection stores only a [`PaperId`] and resolves it against the live
//! store on every read, so the detail view always shows the latest copy of a
//! record. When the id can no longer be found, the selection closes itself.

use tracing::debug;

use crate::models::{Paper, PaperId};
use crate::store::RecordStore;

/// Open/closed state of the detail view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Closed,
    Open(PaperId),
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or switch) the detail view to `id`.
    pub fn select(&mut self, id: PaperId) {
        *self = Selection::Open(id);
    }

    pub fn clear(&mut self) {
        *self = Selection::Closed;
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Selection::Open(_))
    }

    pub fn selected_id(&self) -> Option<&PaperId> {
        match self {
            Selection::Open(id) => Some(id),
            Selection::Closed => None,
        }
    }

    /// Resolve the selection against `store`.
    ///
    /// An id missing from the store closes the selection and yields `None`.
    pub fn current<'s>(&mut self, store: &'s RecordStore) -> Option<&'s Paper> {
        let Selection::Open(id) = self else {
            return None;
        };
        match store.find(id) {
            Some(paper) => Some(paper),
            None => {
                debug!("Selected paper {} is gone; closing detail view", id);
                self.clear();
                None
            }
        }
    }

    /// Close the selection if its record has disappeared from `store`.
    ///
    /// Returns `true` when the selection was closed by this call.
    pub fn reconcile(&mut self, store: &RecordStore) -> bool {
        let was_open = self.is_open();
        self.current(store);
        was_open && !self.is_open()
    }
}
