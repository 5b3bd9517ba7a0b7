//! Reference discovery.
//!
//! A [`ReferenceCollector`] turns one asset into the list of references it
//! holds. It looks at that asset only and never resolves what it finds;
//! resolution belongs to the dependency graph.

use bitflags::bitflags;
use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};

use crate::asset::AssetItem;
use crate::content::{AssetReference, VisitReferences};
use crate::id::AssetId;

bitflags! {
    /// Kind of a link between two assets.
    ///
    /// A set of flags so that future link kinds can coexist on one edge and
    /// be filtered with a mask at query time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct LinkType: u32 {
        /// A plain reference to another asset.
        const REFERENCE = 1;
        /// Every link kind.
        const ALL = Self::REFERENCE.bits();
    }
}

impl Default for LinkType {
    fn default() -> Self {
        LinkType::REFERENCE
    }
}

/// One outgoing reference found in an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedReference {
    pub reference: AssetReference,
    pub link_type: LinkType,
}

/// Extracts outgoing references from a single asset.
pub trait ReferenceCollector: Send + Sync {
    fn collect(&self, item: &AssetItem) -> Vec<CollectedReference>;
}

/// Collector for [`Content`](crate::Content)-based assets.
///
/// Reports the archetype and every reference value in the content tree.
/// References to the same target are merged into one entry whose link type
/// is the union of all occurrences; self references are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentReferenceCollector;

impl ReferenceCollector for ContentReferenceCollector {
    fn collect(&self, item: &AssetItem) -> Vec<CollectedReference> {
        let own_id = item.id();
        let mut order: Vec<AssetId> = Vec::new();
        let mut merged: HashMap<AssetId, CollectedReference> = HashMap::default();

        item.asset.visit_references(&mut |reference| {
            if reference.id == own_id || reference.id.is_nil() {
                return;
            }
            merged
                .entry(reference.id)
                .and_modify(|existing| existing.link_type |= LinkType::REFERENCE)
                .or_insert_with(|| {
                    order.push(reference.id);
                    CollectedReference {
                        reference: reference.clone(),
                        link_type: LinkType::REFERENCE,
                    }
                });
        });

        order
            .into_iter()
            .filter_map(|id| merged.remove(&id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;

    #[test]
    fn test_collect_merges_duplicate_targets() {
        let target = AssetReference::new(AssetId::new(), "textures/brick");
        let item = AssetItem::builder("materials/wall")
            .content(
                Content::object()
                    .with("diffuse", target.clone())
                    .with("normal", target.clone()),
            )
            .build();

        let collected = ContentReferenceCollector.collect(&item);
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].reference, target);
        assert_eq!(collected[0].link_type, LinkType::REFERENCE);
    }

    #[test]
    fn test_collect_skips_self_and_nil_references() {
        let id = AssetId::new();
        let item = AssetItem::builder_with_id(id, "loop")
            .reference("me", AssetReference::new(id, "loop"))
            .reference("nothing", AssetReference::new(AssetId::nil(), ""))
            .build();

        assert!(ContentReferenceCollector.collect(&item).is_empty());
    }

    #[test]
    fn test_collect_includes_archetype() {
        let base = AssetReference::new(AssetId::new(), "prefabs/base");
        let item = AssetItem::builder("prefabs/derived")
            .archetype(base.clone())
            .build();

        let collected = ContentReferenceCollector.collect(&item);
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].reference, base);
    }

    #[test]
    fn test_link_type_mask() {
        assert!(LinkType::ALL.intersects(LinkType::REFERENCE));
        assert!(!LinkType::empty().intersects(LinkType::REFERENCE));
    }
}
