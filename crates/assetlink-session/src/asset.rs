use serde::{Deserialize, Serialize};

use crate::content::{AssetReference, Content, VisitReferences};
use crate::id::{AssetId, PackageId};

/// The content of an asset together with its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    /// The asset this one derives from, if any.
    pub archetype: Option<AssetReference>,
    pub content: Content,
}

impl Asset {
    pub fn new(id: AssetId) -> Self {
        Self {
            id,
            archetype: None,
            content: Content::object(),
        }
    }
}

impl VisitReferences for Asset {
    fn visit_references(&self, visitor: &mut dyn FnMut(&AssetReference)) {
        if let Some(archetype) = &self.archetype {
            visitor(archetype);
        }
        self.content.visit_references(visitor);
    }
}

/// An asset as it lives inside a package: content plus location metadata.
///
/// Snapshots held by the dependency graph are `Arc<AssetItem>` copies of this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetItem {
    pub location: String,
    /// Owning package, set when the item is added to a session.
    pub package: Option<PackageId>,
    /// Incremented on every content edit.
    pub version: u64,
    pub is_dirty: bool,
    pub asset: Asset,
}

impl AssetItem {
    /// Create a builder for an item with a fresh id.
    pub fn builder(location: impl Into<String>) -> AssetItemBuilder {
        Self::builder_with_id(AssetId::new(), location)
    }

    pub fn builder_with_id(id: AssetId, location: impl Into<String>) -> AssetItemBuilder {
        AssetItemBuilder {
            item: Self {
                location: location.into(),
                package: None,
                version: 0,
                is_dirty: false,
                asset: Asset::new(id),
            },
        }
    }

    pub fn id(&self) -> AssetId {
        self.asset.id
    }

    /// A reference pointing at this item.
    pub fn to_reference(&self) -> AssetReference {
        AssetReference::new(self.asset.id, self.location.clone())
    }
}

/// Builder for [`AssetItem`].
#[derive(Debug)]
pub struct AssetItemBuilder {
    item: AssetItem,
}

impl AssetItemBuilder {
    pub fn content(mut self, content: Content) -> Self {
        self.item.asset.content = content;
        self
    }

    /// Add a named field holding a reference to `target`.
    pub fn reference(mut self, field: impl Into<String>, target: AssetReference) -> Self {
        self.item.asset.content.set(field, target);
        self
    }

    pub fn archetype(mut self, base: AssetReference) -> Self {
        self.item.asset.archetype = Some(base);
        self
    }

    pub fn dirty(mut self, is_dirty: bool) -> Self {
        self.item.is_dirty = is_dirty;
        self
    }

    pub fn build(self) -> AssetItem {
        self.item
    }
}
