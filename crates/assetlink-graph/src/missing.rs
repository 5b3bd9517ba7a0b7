//! Reverse index of unresolved references.
//!
//! Maps every id that some record references but that is not tracked to
//! the records waiting on it. When an asset appears, only those waiting
//! records need to be touched instead of rescanning the graph.

use assetlink_session::AssetId;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::record::DependencyRecord;

#[derive(Debug, Clone, Default)]
pub(crate) struct MissingReferenceIndex {
    /// Records with at least one broken outgoing link.
    assets_with_missing_references: HashSet<AssetId>,
    /// Missing target id to the records whose broken links point at it.
    missing_references_to_parent: HashMap<AssetId, HashSet<AssetId>>,
}

impl MissingReferenceIndex {
    /// Forget everything the index knows about `record`'s broken links.
    pub(crate) fn remove_record(&mut self, record: &DependencyRecord) {
        let id = record.id();
        self.assets_with_missing_references.remove(&id);

        for target in record.broken_links_out.keys() {
            if let Some(parents) = self.missing_references_to_parent.get_mut(target) {
                parents.remove(&id);
                if parents.is_empty() {
                    self.missing_references_to_parent.remove(target);
                }
            }
        }
    }

    /// Register `record`'s current broken links.
    pub(crate) fn insert_record(&mut self, record: &DependencyRecord) {
        if !record.has_broken_links() {
            return;
        }
        let id = record.id();
        self.assets_with_missing_references.insert(id);
        for target in record.broken_links_out.keys() {
            self.missing_references_to_parent
                .entry(*target)
                .or_default()
                .insert(id);
        }
    }

    /// Remove and return the records waiting on `target`.
    pub(crate) fn take_waiting_parents(&mut self, target: &AssetId) -> Vec<AssetId> {
        self.missing_references_to_parent
            .remove(target)
            .map(|parents| parents.into_iter().collect())
            .unwrap_or_default()
    }

    /// Drop `record` from the set of assets with missing references.
    pub(crate) fn mark_complete(&mut self, record: &AssetId) {
        self.assets_with_missing_references.remove(record);
    }

    pub(crate) fn assets_with_missing_references(&self) -> impl Iterator<Item = &AssetId> {
        self.assets_with_missing_references.iter()
    }

    pub(crate) fn waiting_on(&self, target: &AssetId) -> Vec<AssetId> {
        self.missing_references_to_parent
            .get(target)
            .map(|parents| parents.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn parents(&self) -> &HashMap<AssetId, HashSet<AssetId>> {
        &self.missing_references_to_parent
    }

    pub(crate) fn len(&self) -> usize {
        self.missing_references_to_parent.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assetlink_session::{AssetItem, AssetReference, LinkType};

    use super::*;

    fn record_with_broken(targets: &[AssetId]) -> DependencyRecord {
        let mut record = DependencyRecord::new(Arc::new(AssetItem::builder("r").build()));
        for target in targets {
            record.add_broken_link_out(AssetReference::new(*target, "x"), LinkType::REFERENCE);
        }
        record
    }

    #[test]
    fn test_insert_then_remove_leaves_index_empty() {
        let x = AssetId::new();
        let y = AssetId::new();
        let record = record_with_broken(&[x, y]);
        let mut index = MissingReferenceIndex::default();

        index.insert_record(&record);
        assert_eq!(index.len(), 2);
        assert!(index.assets_with_missing_references().any(|id| *id == record.id()));
        assert_eq!(index.waiting_on(&x), vec![record.id()]);

        index.remove_record(&record);
        assert_eq!(index.len(), 0);
        assert_eq!(index.assets_with_missing_references().count(), 0);
    }

    #[test]
    fn test_shared_target_pruned_only_when_last_parent_leaves() {
        let x = AssetId::new();
        let first = record_with_broken(&[x]);
        let second = record_with_broken(&[x]);
        let mut index = MissingReferenceIndex::default();
        index.insert_record(&first);
        index.insert_record(&second);

        index.remove_record(&first);
        assert_eq!(index.waiting_on(&x), vec![second.id()]);
        index.remove_record(&second);
        assert!(index.waiting_on(&x).is_empty());
    }

    #[test]
    fn test_records_without_broken_links_are_not_indexed() {
        let record = record_with_broken(&[]);
        let mut index = MissingReferenceIndex::default();
        index.insert_record(&record);
        assert_eq!(index.assets_with_missing_references().count(), 0);
    }

    #[test]
    fn test_take_waiting_parents_drains_entry() {
        let x = AssetId::new();
        let record = record_with_broken(&[x]);
        let mut index = MissingReferenceIndex::default();
        index.insert_record(&record);

        assert_eq!(index.take_waiting_parents(&x), vec![record.id()]);
        assert!(index.take_waiting_parents(&x).is_empty());
        assert_eq!(index.len(), 0);
    }
}
