use std::sync::Arc;

use indexmap::IndexMap;

use crate::asset::AssetItem;
use crate::id::{AssetId, PackageId};

/// A named container of assets.
///
/// System packages are read-only: their assets never change once loaded.
/// Items are stored behind `Arc` and replaced wholesale on edit, so a handle
/// obtained from the session is never mutated underneath its holder.
#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub is_system: bool,
    assets: IndexMap<AssetId, Arc<AssetItem>>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PackageId::new(),
            name: name.into(),
            is_system: false,
            assets: IndexMap::new(),
        }
    }

    /// Create a read-only package.
    pub fn system(name: impl Into<String>) -> Self {
        Self {
            is_system: true,
            ..Self::new(name)
        }
    }

    /// Builder-style asset insertion, used to populate a package before it
    /// joins a session.
    pub fn with_asset(mut self, item: AssetItem) -> Self {
        self.insert(item);
        self
    }

    pub(crate) fn insert(&mut self, mut item: AssetItem) -> Arc<AssetItem> {
        item.package = Some(self.id);
        let item = Arc::new(item);
        self.assets.insert(item.id(), Arc::clone(&item));
        item
    }

    pub(crate) fn take(&mut self, id: &AssetId) -> Option<Arc<AssetItem>> {
        self.assets.shift_remove(id)
    }

    pub(crate) fn get_mut(&mut self, id: &AssetId) -> Option<&mut Arc<AssetItem>> {
        self.assets.get_mut(id)
    }

    pub(crate) fn drain(&mut self) -> Vec<Arc<AssetItem>> {
        self.assets.drain(..).map(|(_, item)| item).collect()
    }

    pub fn get(&self, id: &AssetId) -> Option<&Arc<AssetItem>> {
        self.assets.get(id)
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.assets.contains_key(id)
    }

    pub fn assets(&self) -> impl Iterator<Item = &Arc<AssetItem>> {
        self.assets.values()
    }

    pub fn asset_ids(&self) -> Vec<AssetId> {
        self.assets.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserted_assets_record_their_package() {
        let package = Package::new("game").with_asset(AssetItem::builder("a").build());
        let item = package.assets().next().unwrap();
        assert_eq!(item.package, Some(package.id));
        assert_eq!(package.len(), 1);
        assert!(!package.is_system);
    }

    #[test]
    fn test_system_package_flag() {
        assert!(Package::system("core").is_system);
    }
}
