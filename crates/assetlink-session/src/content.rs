//! Asset content values and the references they carry.
//!
//! Content is a small tree of plain values. Any node may be a typed
//! [`AssetReference`] pointing at another asset; those are what the
//! reference collector extracts. Content types expose their references
//! through [`VisitReferences`], so discovery is resolved statically per type
//! instead of walking values reflectively.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::AssetId;

/// A typed reference from one asset to another.
///
/// Carries the target id and the location the target had when the reference
/// was written. The location is informational only; resolution is by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetReference {
    pub id: AssetId,
    pub location: String,
}

impl AssetReference {
    pub fn new(id: AssetId, location: impl Into<String>) -> Self {
        Self {
            id,
            location: location.into(),
        }
    }
}

/// A node of asset content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Content {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Reference(AssetReference),
    List(Vec<Content>),
    Object(IndexMap<String, Content>),
}

impl Content {
    /// Start an empty object node.
    pub fn object() -> Self {
        Content::Object(IndexMap::new())
    }

    /// Builder-style field insertion. Non-object nodes are turned into objects.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Content>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a field, converting this node into an object if needed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Content>) {
        if !matches!(self, Content::Object(_)) {
            *self = Content::object();
        }
        if let Content::Object(fields) = self {
            fields.insert(key.into(), value.into());
        }
    }

    /// Remove a field from an object node.
    pub fn remove(&mut self, key: &str) -> Option<Content> {
        match self {
            Content::Object(fields) => fields.shift_remove(key),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Content> {
        match self {
            Content::Object(fields) => fields.get(key),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&AssetReference> {
        match self {
            Content::Reference(reference) => Some(reference),
            _ => None,
        }
    }
}

impl From<bool> for Content {
    fn from(value: bool) -> Self {
        Content::Bool(value)
    }
}

impl From<i64> for Content {
    fn from(value: i64) -> Self {
        Content::Integer(value)
    }
}

impl From<f64> for Content {
    fn from(value: f64) -> Self {
        Content::Float(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Text(value.to_string())
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

impl From<AssetReference> for Content {
    fn from(value: AssetReference) -> Self {
        Content::Reference(value)
    }
}

impl From<Vec<Content>> for Content {
    fn from(value: Vec<Content>) -> Self {
        Content::List(value)
    }
}

/// Capability of a content type to enumerate the asset references it holds.
///
/// Implementations report references found in their own value only. They
/// never follow a reference into the target asset.
pub trait VisitReferences {
    fn visit_references(&self, visitor: &mut dyn FnMut(&AssetReference));
}

impl VisitReferences for Content {
    fn visit_references(&self, visitor: &mut dyn FnMut(&AssetReference)) {
        // Iterative walk; content trees may be deep.
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Content::Reference(reference) => visitor(reference),
                Content::List(items) => stack.extend(items.iter().rev()),
                Content::Object(fields) => stack.extend(fields.values().rev()),
                Content::Null
                | Content::Bool(_)
                | Content::Integer(_)
                | Content::Float(_)
                | Content::Text(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(location: &str) -> AssetReference {
        AssetReference::new(AssetId::new(), location)
    }

    #[test]
    fn test_visit_references_finds_nested_values_in_order() {
        let first = reference("textures/a");
        let second = reference("textures/b");
        let third = reference("materials/c");

        let content = Content::object()
            .with("name", "hero")
            .with("diffuse", first.clone())
            .with(
                "layers",
                vec![
                    Content::object().with("texture", second.clone()),
                    Content::Integer(3),
                ],
            )
            .with("material", third.clone());

        let mut seen = Vec::new();
        content.visit_references(&mut |r| seen.push(r.clone()));

        assert_eq!(seen, vec![first, second, third]);
    }

    #[test]
    fn test_scalars_have_no_references() {
        let mut count = 0;
        Content::Text("plain".into()).visit_references(&mut |_| count += 1);
        Content::Null.visit_references(&mut |_| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_set_converts_scalar_into_object() {
        let mut content = Content::Integer(1);
        content.set("value", 2i64);
        assert_eq!(content.get("value"), Some(&Content::Integer(2)));
        assert_eq!(content.remove("value"), Some(Content::Integer(2)));
        assert!(content.get("value").is_none());
    }
}
