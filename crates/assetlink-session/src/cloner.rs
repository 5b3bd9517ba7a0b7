use std::sync::Arc;

use crate::asset::AssetItem;

/// Produces detached snapshots of live assets.
pub trait AssetCloner: Send + Sync {
    fn clone_asset(&self, item: &AssetItem) -> AssetItem;

    /// Snapshot `item` into a fresh allocation that shares nothing with the
    /// live handle.
    fn snapshot(&self, item: &AssetItem) -> Arc<AssetItem> {
        Arc::new(self.clone_asset(item))
    }
}

/// Deep copy through `Clone`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeepCloner;

impl AssetCloner for DeepCloner {
    fn clone_asset(&self, item: &AssetItem) -> AssetItem {
        item.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_a_separate_allocation() {
        let live = Arc::new(AssetItem::builder("a").build());
        let snapshot = DeepCloner.snapshot(&live);
        assert!(!Arc::ptr_eq(&live, &snapshot));
        assert_eq!(*live, *snapshot);
    }
}
