//! Read-only queries. Every result is detached from the live graph.

use std::collections::HashSet;
use std::sync::Arc;

use assetlink_session::{AssetId, AssetReference, LinkType, PackageId};

use super::{DependencyManager, GraphState};
use crate::link::SearchOptions;
use crate::record::AssetDependencies;

impl GraphState {
    pub(crate) fn collect_dependencies(
        &self,
        id: &AssetId,
        options: SearchOptions,
        link_types: LinkType,
        visited: &mut HashSet<AssetId>,
    ) -> Option<AssetDependencies> {
        let root = self.records.get(id)?;
        let mut result = AssetDependencies::new(Arc::clone(&root.item));
        let recursive = options.contains(SearchOptions::RECURSIVE);

        if options.contains(SearchOptions::IN) {
            visited.insert(*id);
            let mut stack = vec![*id];
            while let Some(current) = stack.pop() {
                let Some(record) = self.records.get(&current) else {
                    continue;
                };
                for (source, link_type) in &record.links_in {
                    let masked = *link_type & link_types;
                    if masked.is_empty() {
                        continue;
                    }
                    let Some(source_record) = self.records.get(source) else {
                        continue;
                    };
                    result.add_link_in(Arc::clone(&source_record.item), masked);
                    if recursive && visited.insert(*source) {
                        stack.push(*source);
                    }
                }
            }
        }

        if options.contains(SearchOptions::OUT) {
            visited.clear();
            visited.insert(*id);
            let mut stack = vec![*id];
            while let Some(current) = stack.pop() {
                let Some(record) = self.records.get(&current) else {
                    continue;
                };
                for (target, link_type) in &record.links_out {
                    let masked = *link_type & link_types;
                    if masked.is_empty() {
                        continue;
                    }
                    let Some(target_record) = self.records.get(target) else {
                        continue;
                    };
                    result.add_link_out(Arc::clone(&target_record.item), masked);
                    if recursive && visited.insert(*target) {
                        stack.push(*target);
                    }
                }
                for broken in record.broken_links_out.values() {
                    let masked = broken.link_type & link_types;
                    if !masked.is_empty() {
                        result.add_broken_link_out(broken.reference.clone(), masked);
                    }
                }
            }
        }

        Some(result)
    }

    /// Direct edges of one record, every link type.
    pub(crate) fn direct_view(&self, id: &AssetId) -> Option<AssetDependencies> {
        self.collect_dependencies(id, SearchOptions::IN_OUT, LinkType::ALL, &mut HashSet::new())
    }
}

impl DependencyManager {
    /// Dependencies of a tracked asset.
    ///
    /// `options` selects incoming and/or outgoing links and whether to walk
    /// transitively; `link_types` masks which links count. Returns `None` for
    /// an untracked id or a disposed manager.
    ///
    /// ```rust
    /// use assetlink_graph::{DependencyManager, LinkType, SearchOptions};
    /// use assetlink_config::GraphSettings;
    /// use assetlink_session::{AssetItem, Package, Session};
    /// use std::sync::Arc;
    ///
    /// let session = Arc::new(Session::new());
    /// let texture = AssetItem::builder("textures/brick").build();
    /// let material = AssetItem::builder("materials/wall")
    ///     .reference("diffuse", texture.to_reference())
    ///     .build();
    /// let (texture_id, material_id) = (texture.id(), material.id());
    /// session
    ///     .add_package(Package::new("game").with_asset(texture).with_asset(material))
    ///     .unwrap();
    ///
    /// let settings = GraphSettings { eager_initialization: false, ..Default::default() };
    /// let manager = DependencyManager::new(Arc::clone(&session), settings);
    /// let deps = manager
    ///     .compute_dependencies(&texture_id, SearchOptions::IN, LinkType::ALL)
    ///     .unwrap();
    /// assert_eq!(deps.input_ids(), vec![material_id]);
    /// ```
    pub fn compute_dependencies(
        &self,
        id: &AssetId,
        options: SearchOptions,
        link_types: LinkType,
    ) -> Option<AssetDependencies> {
        let mut visited = HashSet::new();
        self.compute_dependencies_with_visited(id, options, link_types, &mut visited)
    }

    /// Like [`compute_dependencies`](Self::compute_dependencies), with a
    /// caller-owned visited set. Ids already in `visited` are not expanded by
    /// the incoming walk; the outgoing walk starts from a cleared set.
    pub fn compute_dependencies_with_visited(
        &self,
        id: &AssetId,
        options: SearchOptions,
        link_types: LinkType,
        visited: &mut HashSet<AssetId>,
    ) -> Option<AssetDependencies> {
        let guard = self.initialize();
        if self.is_inert() {
            return None;
        }
        let state = guard.state();
        state.collect_dependencies(id, options, link_types, visited)
    }

    /// Direct incoming and outgoing links of a tracked asset.
    pub fn find_dependency_record(&self, id: &AssetId) -> Option<AssetDependencies> {
        let guard = self.initialize();
        if self.is_inert() {
            return None;
        }
        let state = guard.state();
        state.direct_view(id)
    }

    /// Tracked assets with at least one unresolved reference, sorted.
    pub fn find_assets_with_missing_references(&self) -> Vec<AssetId> {
        self.read(|state| {
            let mut ids: Vec<AssetId> = state.missing.assets_with_missing_references().copied().collect();
            ids.sort();
            ids
        })
    }

    /// Unresolved references of one tracked asset.
    pub fn find_missing_references(&self, id: &AssetId) -> Vec<AssetReference> {
        self.read(|state| {
            let Some(record) = state.records.get(id) else {
                return Vec::new();
            };
            let mut references: Vec<AssetReference> = record
                .broken_links_out
                .values()
                .map(|broken| broken.reference.clone())
                .collect();
            references.sort_by_key(|reference| reference.id);
            references
        })
    }

    /// Tracked assets whose references to `missing` are unresolved, sorted.
    pub fn find_assets_waiting_on(&self, missing: &AssetId) -> Vec<AssetId> {
        self.read(|state| {
            let mut ids = state.missing.waiting_on(missing);
            ids.sort();
            ids
        })
    }

    pub fn is_tracked(&self, id: &AssetId) -> bool {
        self.read(|state| state.records.contains_key(id))
    }

    pub fn tracked_asset_ids(&self) -> Vec<AssetId> {
        self.read(|state| {
            let mut ids: Vec<AssetId> = state.records.keys().copied().collect();
            ids.sort();
            ids
        })
    }

    pub fn tracked_packages(&self) -> Vec<PackageId> {
        self.read(|state| {
            let mut ids: Vec<PackageId> = state.packages.keys().copied().collect();
            ids.sort();
            ids
        })
    }

    /// Run `query` against the initialized graph, or return the default
    /// when disposed.
    pub(crate) fn read<R: Default>(&self, query: impl FnOnce(&GraphState) -> R) -> R {
        let guard = self.initialize();
        if self.is_inert() {
            return R::default();
        }
        let state = guard.state();
        query(&*state)
    }
}
