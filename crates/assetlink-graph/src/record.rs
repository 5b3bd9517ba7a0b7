//! Graph nodes.
//!
//! [`DependencyRecord`] is the live node stored in the manager's arena. Its
//! edges are asset ids resolved through the arena, so records never point at
//! each other. [`AssetDependencies`] is the detached copy handed to callers.

use std::sync::Arc;

use assetlink_session::{AssetId, AssetItem, AssetReference, LinkType};
use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};

use crate::link::{AssetLink, LinkTarget};

/// An outgoing reference whose target is not tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BrokenLink {
    pub(crate) reference: AssetReference,
    pub(crate) link_type: LinkType,
}

/// Live graph node for one tracked asset.
#[derive(Debug, Clone)]
pub(crate) struct DependencyRecord {
    pub(crate) item: Arc<AssetItem>,
    /// Resolved outgoing links, by target id.
    pub(crate) links_out: HashMap<AssetId, LinkType>,
    /// Unresolved outgoing links, by target id.
    pub(crate) broken_links_out: HashMap<AssetId, BrokenLink>,
    /// Back-references, by source id. Lookup aid only.
    pub(crate) links_in: HashMap<AssetId, LinkType>,
}

impl DependencyRecord {
    pub(crate) fn new(item: Arc<AssetItem>) -> Self {
        Self {
            item,
            links_out: HashMap::default(),
            broken_links_out: HashMap::default(),
            links_in: HashMap::default(),
        }
    }

    pub(crate) fn id(&self) -> AssetId {
        self.item.id()
    }

    pub(crate) fn has_broken_links(&self) -> bool {
        !self.broken_links_out.is_empty()
    }

    pub(crate) fn add_link_out(&mut self, target: AssetId, link_type: LinkType) {
        *self.links_out.entry(target).or_insert(LinkType::empty()) |= link_type;
    }

    pub(crate) fn remove_link_out(&mut self, target: &AssetId) -> Option<LinkType> {
        self.links_out.remove(target)
    }

    pub(crate) fn add_broken_link_out(&mut self, reference: AssetReference, link_type: LinkType) {
        self.broken_links_out
            .entry(reference.id)
            .and_modify(|link| link.link_type |= link_type)
            .or_insert(BrokenLink {
                reference,
                link_type,
            });
    }

    pub(crate) fn remove_broken_link_out(&mut self, target: &AssetId) -> Option<BrokenLink> {
        self.broken_links_out.remove(target)
    }

    pub(crate) fn add_link_in(&mut self, source: AssetId, link_type: LinkType) {
        *self.links_in.entry(source).or_insert(LinkType::empty()) |= link_type;
    }

    pub(crate) fn remove_link_in(&mut self, source: &AssetId) -> Option<LinkType> {
        self.links_in.remove(source)
    }
}

/// A detached view of an asset's dependencies.
///
/// Produced by queries on [`DependencyManager`](crate::DependencyManager).
/// It owns its link maps and shares only immutable snapshots with the live
/// graph, so later graph mutations never show through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDependencies {
    item: Arc<AssetItem>,
    links_in: HashMap<AssetId, AssetLink>,
    links_out: HashMap<AssetId, AssetLink>,
    broken_links_out: HashMap<AssetId, AssetLink>,
}

impl AssetDependencies {
    pub fn new(item: Arc<AssetItem>) -> Self {
        Self {
            item,
            links_in: HashMap::default(),
            links_out: HashMap::default(),
            broken_links_out: HashMap::default(),
        }
    }

    pub fn id(&self) -> AssetId {
        self.item.id()
    }

    /// The snapshot of the root asset.
    pub fn item(&self) -> &Arc<AssetItem> {
        &self.item
    }

    pub fn links_in(&self) -> impl Iterator<Item = &AssetLink> {
        self.links_in.values()
    }

    pub fn links_out(&self) -> impl Iterator<Item = &AssetLink> {
        self.links_out.values()
    }

    pub fn broken_links_out(&self) -> impl Iterator<Item = &AssetLink> {
        self.broken_links_out.values()
    }

    pub fn link_in(&self, source: &AssetId) -> Option<&AssetLink> {
        self.links_in.get(source)
    }

    pub fn link_out(&self, target: &AssetId) -> Option<&AssetLink> {
        self.links_out.get(target)
    }

    pub fn broken_link_out(&self, target: &AssetId) -> Option<&AssetLink> {
        self.broken_links_out.get(target)
    }

    /// Ids of every asset with a link into the root (or into an asset reached
    /// from it, for recursive queries), sorted.
    pub fn input_ids(&self) -> Vec<AssetId> {
        sorted_keys(&self.links_in)
    }

    pub fn output_ids(&self) -> Vec<AssetId> {
        sorted_keys(&self.links_out)
    }

    pub fn missing_ids(&self) -> Vec<AssetId> {
        sorted_keys(&self.broken_links_out)
    }

    pub fn has_missing_references(&self) -> bool {
        !self.broken_links_out.is_empty()
    }

    pub(crate) fn add_link_in(&mut self, source: Arc<AssetItem>, link_type: LinkType) {
        merge_link(&mut self.links_in, LinkTarget::Resolved(source), link_type);
    }

    pub(crate) fn add_link_out(&mut self, target: Arc<AssetItem>, link_type: LinkType) {
        merge_link(&mut self.links_out, LinkTarget::Resolved(target), link_type);
    }

    pub(crate) fn add_broken_link_out(&mut self, reference: AssetReference, link_type: LinkType) {
        merge_link(
            &mut self.broken_links_out,
            LinkTarget::Missing(reference),
            link_type,
        );
    }
}

fn merge_link(links: &mut HashMap<AssetId, AssetLink>, target: LinkTarget, link_type: LinkType) {
    links
        .entry(target.id())
        .and_modify(|link| link.link_type |= link_type)
        .or_insert(AssetLink { target, link_type });
}

fn sorted_keys(links: &HashMap<AssetId, AssetLink>) -> Vec<AssetId> {
    let mut ids: Vec<AssetId> = links.keys().copied().collect();
    ids.sort();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(location: &str) -> Arc<AssetItem> {
        Arc::new(AssetItem::builder(location).build())
    }

    #[test]
    fn test_record_links_merge_types() {
        let mut record = DependencyRecord::new(item("a"));
        let target = AssetId::new();
        record.add_link_out(target, LinkType::REFERENCE);
        record.add_link_out(target, LinkType::REFERENCE);
        assert_eq!(record.links_out.len(), 1);
        assert_eq!(record.remove_link_out(&target), Some(LinkType::REFERENCE));
        assert!(record.links_out.is_empty());
    }

    #[test]
    fn test_record_broken_links() {
        let mut record = DependencyRecord::new(item("a"));
        let missing = AssetReference::new(AssetId::new(), "gone");
        assert!(!record.has_broken_links());
        record.add_broken_link_out(missing.clone(), LinkType::REFERENCE);
        assert!(record.has_broken_links());
        let removed = record.remove_broken_link_out(&missing.id).unwrap();
        assert_eq!(removed.reference, missing);
        assert!(!record.has_broken_links());
    }

    #[test]
    fn test_detached_view_reports_sorted_ids() {
        let root = item("root");
        let mut deps = AssetDependencies::new(Arc::clone(&root));
        let a = item("a");
        let b = item("b");
        deps.add_link_out(Arc::clone(&a), LinkType::REFERENCE);
        deps.add_link_out(Arc::clone(&b), LinkType::REFERENCE);
        deps.add_link_out(Arc::clone(&a), LinkType::REFERENCE);

        let mut expected = vec![a.id(), b.id()];
        expected.sort();
        assert_eq!(deps.output_ids(), expected);
        assert!(deps.link_out(&a.id()).unwrap().target.is_resolved());
        assert_eq!(deps.id(), root.id());
    }

    #[test]
    fn test_detached_view_serializes_links() {
        let mut deps = AssetDependencies::new(item("root"));
        let missing = AssetReference::new(AssetId::new(), "gone");
        deps.add_broken_link_out(missing.clone(), LinkType::REFERENCE);

        let json = serde_json::to_value(&deps).unwrap();
        let broken = &json["broken_links_out"][missing.id.to_string()];
        assert_eq!(broken["target"]["Missing"]["location"], "gone");

        let back: AssetDependencies = serde_json::from_value(json).unwrap();
        assert_eq!(back, deps);
    }
}
