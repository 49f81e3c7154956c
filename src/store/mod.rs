//! Record collection store.
//!
//! Holds the two independently loaded partitions of the working set:
//! papers brought in by ingestion and papers returned by a recommendation
//! query. Each partition is replaced wholesale when its source answers, so a
//! reader never sees a mix of old and new records for one partition. The
//! merged view is computed on read instead of being kept as a second list.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Paper, PaperId};

/// Names of the two partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Ingested,
    Recommended,
}

impl Partition {
    pub const ALL: [Partition; 2] = [Partition::Ingested, Partition::Recommended];

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Ingested => "ingested",
            Partition::Recommended => "recommended",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contents and loading flag of one partition.
#[derive(Debug, Clone, Default)]
pub struct PartitionState {
    /// Records in arrival order
    pub records: Vec<Paper>,

    /// Whether a request for this partition is outstanding
    pub is_loading: bool,
}

/// The two-partition record store.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    ingested: PartitionState,
    recommended: PartitionState,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, partition: Partition) -> &PartitionState {
        match partition {
            Partition::Ingested => &self.ingested,
            Partition::Recommended => &self.recommended,
        }
    }

    fn slot_mut(&mut self, partition: Partition) -> &mut PartitionState {
        match partition {
            Partition::Ingested => &mut self.ingested,
            Partition::Recommended => &mut self.recommended,
        }
    }

    /// Swap a partition's contents and clear its loading flag.
    pub fn replace_partition(&mut self, partition: Partition, records: Vec<Paper>) {
        debug!("Replacing {} partition with {} records", partition, records.len());
        let slot = self.slot_mut(partition);
        slot.records = records;
        slot.is_loading = false;
    }

    pub fn set_loading(&mut self, partition: Partition, loading: bool) {
        self.slot_mut(partition).is_loading = loading;
    }

    pub fn is_loading(&self, partition: Partition) -> bool {
        self.slot(partition).is_loading
    }

    pub fn any_loading(&self) -> bool {
        Partition::ALL.iter().any(|p| self.is_loading(*p))
    }

    pub fn partition(&self, partition: Partition) -> &[Paper] {
        &self.slot(partition).records
    }

    /// All records: ingested first, then recommended, each in arrival order.
    ///
    /// Records present in both partitions appear twice.
    pub fn merged(&self) -> Vec<&Paper> {
        self.ingested
            .records
            .iter()
            .chain(self.recommended.records.iter())
            .collect()
    }

    /// Owned copy of [`merged`](Self::merged).
    pub fn merged_owned(&self) -> Vec<Paper> {
        self.merged().into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ingested.records.len() + self.recommended.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a record by id in the merged view.
    ///
    /// When an id is present in both partitions the ingested copy wins, which
    /// is the first occurrence in merged order.
    pub fn find(&self, id: &PaperId) -> Option<&Paper> {
        self.ingested
            .records
            .iter()
            .chain(self.recommended.records.iter())
            .find(|p| &p.id == id)
    }

    pub fn contains(&self, id: &PaperId) -> bool {
        self.find(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(papers: &[&Paper]) -> Vec<String> {
        papers.iter().map(|p| p.id.to_string()).collect()
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = RecordStore::new();
        assert!(store.is_empty());
        assert!(store.merged().is_empty());
        assert!(!store.any_loading());
    }

    #[test]
    fn test_merged_order_is_ingested_then_recommended() {
        let mut store = RecordStore::new();
        store.replace_partition(Partition::Recommended, vec![Paper::new(3, "C"), Paper::new(4, "D")]);
        store.replace_partition(Partition::Ingested, vec![Paper::new(1, "A"), Paper::new(2, "B")]);

        assert_eq!(ids(&store.merged()), vec!["1", "2", "3", "4"]);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_replace_is_wholesale_and_clears_loading() {
        let mut store = RecordStore::new();
        store.replace_partition(Partition::Ingested, vec![Paper::new(1, "A"), Paper::new(2, "B")]);
        store.set_loading(Partition::Ingested, true);
        assert!(store.is_loading(Partition::Ingested));
        assert!(store.any_loading());

        store.replace_partition(Partition::Ingested, vec![Paper::new(9, "Z")]);

        assert!(!store.is_loading(Partition::Ingested));
        assert_eq!(ids(&store.merged()), vec!["9"]);
    }

    #[test]
    fn test_partitions_are_independent() {
        let mut store = RecordStore::new();
        store.replace_partition(Partition::Ingested, vec![Paper::new(1, "A")]);
        store.replace_partition(Partition::Recommended, vec![Paper::new(2, "B")]);
        store.set_loading(Partition::Recommended, true);

        store.replace_partition(Partition::Recommended, Vec::new());

        assert_eq!(store.partition(Partition::Ingested).len(), 1);
        assert!(store.partition(Partition::Recommended).is_empty());
        assert!(!store.is_loading(Partition::Ingested));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut store = RecordStore::new();
        store.replace_partition(Partition::Ingested, vec![Paper::new(1, "Old title")]);
        store.replace_partition(Partition::Recommended, vec![Paper::new(1, "New title")]);

        assert_eq!(ids(&store.merged()), vec!["1", "1"]);
        assert_eq!(store.find(&PaperId::from(1)).unwrap().title, "Old title");
    }

    #[test]
    fn test_find_and_contains() {
        let mut store = RecordStore::new();
        store.replace_partition(Partition::Recommended, vec![Paper::new(5, "E")]);

        assert!(store.contains(&PaperId::from(5)));
        assert!(!store.contains(&PaperId::from(6)));
        assert_eq!(store.find(&PaperId::from(5)).unwrap().title, "E");
    }
}
