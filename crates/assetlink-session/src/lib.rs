//! # assetlink-session
//!
//! The live collection of packages and assets that the dependency graph in
//! `assetlink-graph` observes.
//!
//! A [`Session`] holds [`Package`]s, each holding [`AssetItem`]s. Every
//! mutation is reported to registered [`SessionObserver`]s: package
//! collection changes, per-package asset collection changes, and dirty-flag
//! changes on individual assets.
//!
//! ```rust
//! use assetlink_session::{AssetItem, Package, Session};
//!
//! let session = Session::new();
//! let texture = AssetItem::builder("textures/brick").build();
//! let material = AssetItem::builder("materials/wall")
//!     .reference("diffuse", texture.to_reference())
//!     .build();
//!
//! let package = Package::new("game").with_asset(texture).with_asset(material);
//! session.add_package(package).unwrap();
//! assert_eq!(session.packages()[0].len(), 2);
//! ```
//!
//! Also here are the two capabilities the graph plugs in: a
//! [`ReferenceCollector`] that lists one asset's outgoing references, and an
//! [`AssetCloner`] producing the snapshots the graph keeps.

mod asset;
mod cloner;
mod collector;
mod content;
mod error;
mod id;
mod observer;
mod package;
mod session;

pub use asset::{Asset, AssetItem, AssetItemBuilder};
pub use cloner::{AssetCloner, DeepCloner};
pub use collector::{CollectedReference, ContentReferenceCollector, LinkType, ReferenceCollector};
pub use content::{AssetReference, Content, VisitReferences};
pub use error::{Result, SessionError};
pub use id::{AssetId, PackageId};
pub use observer::{AssetChange, ObserverId, PackageChange, SessionObserver};
pub use package::Package;
pub use session::Session;
