//! Crate-level tests driving a real [`Session`](assetlink_session::Session).

mod property_tests;

use std::sync::Arc;

use assetlink_config::GraphSettings;
use assetlink_session::{AssetId, AssetItem, AssetReference, Package, PackageId, Session};

use crate::DependencyManager;

/// Lazily initialized, with every mutation checked against the invariants.
pub(crate) fn test_settings() -> GraphSettings {
    GraphSettings {
        eager_initialization: false,
        verify_after_mutation: true,
        ..GraphSettings::default()
    }
}

pub(crate) fn asset(location: &str) -> AssetItem {
    AssetItem::builder(location).build()
}

pub(crate) fn asset_with_id(id: AssetId, location: &str) -> AssetItem {
    AssetItem::builder_with_id(id, location).build()
}

/// An asset whose content references each of `targets`.
pub(crate) fn referencing(location: &str, targets: &[AssetReference]) -> AssetItem {
    let mut builder = AssetItem::builder(location);
    for (index, target) in targets.iter().enumerate() {
        builder = builder.reference(format!("ref{index}"), target.clone());
    }
    builder.build()
}

pub(crate) fn sorted(mut ids: Vec<AssetId>) -> Vec<AssetId> {
    ids.sort();
    ids
}

pub(crate) struct Fixture {
    pub(crate) session: Arc<Session>,
    pub(crate) package: PackageId,
    pub(crate) manager: Arc<DependencyManager>,
}

impl Fixture {
    /// One local package holding `assets`, and an initialized manager over it.
    pub(crate) fn new(assets: Vec<AssetItem>) -> Self {
        Self::with_settings(assets, test_settings())
    }

    pub(crate) fn with_settings(assets: Vec<AssetItem>, settings: GraphSettings) -> Self {
        let session = Arc::new(Session::new());
        let mut package = Package::new("local");
        for item in assets {
            package = package.with_asset(item);
        }
        let package_id = package.id;
        session.add_package(package).expect("add package");
        let manager = DependencyManager::new(Arc::clone(&session), settings);
        drop(manager.initialize());
        Self {
            session,
            package: package_id,
            manager,
        }
    }

    pub(crate) fn assert_consistent(&self) {
        if let Err(err) = self.manager.verify_integrity() {
            panic!("graph invariants violated: {err}");
        }
    }
}
