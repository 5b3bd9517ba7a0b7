//! Links between assets as seen by query results.

use std::sync::Arc;

use assetlink_session::{AssetId, AssetItem, AssetReference, LinkType};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// What [`compute_dependencies`](crate::DependencyManager::compute_dependencies)
    /// should collect.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SearchOptions: u8 {
        /// Assets referencing the root.
        const IN = 1;
        /// Assets referenced by the root, plus its broken references.
        const OUT = 1 << 1;
        /// Keep walking from every asset reached.
        const RECURSIVE = 1 << 2;
        const IN_OUT = Self::IN.bits() | Self::OUT.bits();
        const ALL = Self::IN_OUT.bits() | Self::RECURSIVE.bits();
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions::ALL
    }
}

/// The far end of a link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LinkTarget {
    /// A tracked asset, as the snapshot the graph holds.
    Resolved(Arc<AssetItem>),
    /// An asset that is not tracked; only its reference is known.
    Missing(AssetReference),
}

impl LinkTarget {
    pub fn id(&self) -> AssetId {
        match self {
            LinkTarget::Resolved(item) => item.id(),
            LinkTarget::Missing(reference) => reference.id,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            LinkTarget::Resolved(item) => &item.location,
            LinkTarget::Missing(reference) => &reference.location,
        }
    }

    pub fn item(&self) -> Option<&Arc<AssetItem>> {
        match self {
            LinkTarget::Resolved(item) => Some(item),
            LinkTarget::Missing(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, LinkTarget::Resolved(_))
    }
}

/// A typed link to another asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetLink {
    pub target: LinkTarget,
    pub link_type: LinkType,
}

impl AssetLink {
    pub fn resolved(item: Arc<AssetItem>, link_type: LinkType) -> Self {
        Self {
            target: LinkTarget::Resolved(item),
            link_type,
        }
    }

    pub fn missing(reference: AssetReference, link_type: LinkType) -> Self {
        Self {
            target: LinkTarget::Missing(reference),
            link_type,
        }
    }

    pub fn id(&self) -> AssetId {
        self.target.id()
    }
}
