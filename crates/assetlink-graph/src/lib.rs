//! # assetlink-graph
//!
//! Incremental dependency graph over a live asset [`Session`].
//!
//! A [`DependencyManager`] observes one session and keeps, for every tracked
//! asset, its outgoing references, the reciprocal incoming references, and
//! the references it holds to assets that are not there. Only the edited
//! asset's edges are recomputed when something changes.
//!
//! ## Architecture
//!
//! ```text
//!   Session ──notifications──▶ DependencyManager ──AssetChangedEvent──▶ subscribers
//!                                     │
//!                 ┌───────────────────┼────────────────────┐
//!                 ▼                   ▼                    ▼
//!         DependencyRecord    MissingReferenceIndex   ReferenceCollector
//!         (arena by AssetId)  (missing id → waiting)  (one hop per asset)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use assetlink_graph::{DependencyManager, LinkType, SearchOptions};
//! use assetlink_session::{AssetItem, Package, Session};
//!
//! let session = Arc::new(Session::new());
//! let texture = AssetItem::builder("textures/brick").build();
//! let texture_id = texture.id();
//! let material = AssetItem::builder("materials/wall")
//!     .reference("diffuse", texture.to_reference())
//!     .build();
//! let material_id = material.id();
//! let package = Package::new("game").with_asset(material);
//! let package_id = package.id;
//! session.add_package(package).unwrap();
//!
//! let manager = DependencyManager::builder(Arc::clone(&session)).build();
//!
//! // The texture is not in the session yet: the link is broken.
//! assert_eq!(manager.find_assets_waiting_on(&texture_id), vec![material_id]);
//!
//! // Adding it resolves the link without rescanning anything else.
//! session.add_asset(&package_id, texture).unwrap();
//! let deps = manager
//!     .compute_dependencies(&material_id, SearchOptions::OUT, LinkType::ALL)
//!     .unwrap();
//! assert_eq!(deps.output_ids(), vec![texture_id]);
//! assert!(!deps.has_missing_references());
//! ```
//!
//! ## Thread Safety
//!
//! All graph state sits behind one re-entrant lock. Queries return detached
//! [`AssetDependencies`] that share only immutable asset snapshots with the
//! graph.

pub mod error;
pub mod link;
#[cfg(feature = "logging")]
pub mod logging;
mod manager;
mod missing;
mod record;

pub use error::{GraphError, Result};
pub use link::{AssetLink, LinkTarget, SearchOptions};
pub use manager::{
    AssetChangedEvent, DependencyManager, DependencyManagerBuilder, GraphGuard, GraphStatistics,
    SubscriptionId,
};
pub use record::AssetDependencies;

// Types that appear in this crate's public API.
pub use assetlink_session::{AssetId, AssetItem, AssetReference, LinkType, PackageId, Session};

#[cfg(test)]
mod tests;
