//! Tracking and the incremental edge update.

use std::sync::Arc;

use assetlink_session::{AssetId, AssetItem, LinkType, Package, PackageId};
use rustc_hash::FxHashMap as HashMap;

use super::events::AssetChangedEvent;
use super::{DependencyManager, GraphState};
use crate::record::{AssetDependencies, DependencyRecord};

/// One mutation of the graph, applied while the manager's lock is held.
///
/// Assets discovered while wiring edges are tracked right away but their own
/// edges are computed from `pending`, drained by [`finish`](Self::finish),
/// so a single edit never recurses more than one level.
pub(crate) struct Mutation<'a> {
    manager: &'a DependencyManager,
    state: &'a mut GraphState,
    pending: Vec<AssetId>,
    discovered: usize,
    events: Vec<AssetChangedEvent>,
}

impl<'a> Mutation<'a> {
    pub(crate) fn new(manager: &'a DependencyManager, state: &'a mut GraphState) -> Self {
        Self {
            manager,
            state,
            pending: Vec::new(),
            discovered: 0,
            events: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> &GraphState {
        self.state
    }

    pub(crate) fn push_event(&mut self, event: AssetChangedEvent) {
        self.events.push(event);
    }

    /// Compute edges for every asset discovered along the way.
    pub(crate) fn finish(&mut self) {
        while let Some(id) = self.pending.pop() {
            self.update_edges(&id);
        }

        let threshold = self.manager.settings.cascade_warn_threshold;
        if threshold > 0 && self.discovered > threshold {
            tracing::warn!(
                discovered = self.discovered,
                threshold,
                "Single graph mutation tracked an unusually large number of referenced assets"
            );
        }
        self.discovered = 0;
    }

    pub(crate) fn into_events(self) -> Vec<AssetChangedEvent> {
        self.events
    }

    // ---------------------------------------------------------------------
    // Packages
    // ---------------------------------------------------------------------

    pub(crate) fn track_package(&mut self, package: &Package) {
        if self.state.packages.contains_key(&package.id) {
            return;
        }

        // Register before reading the asset list: an asset added from now on
        // is either in the list or delivered as a notification.
        let observer_id = match self.state.watched.remove(&package.id) {
            Some(observer_id) => observer_id,
            None => self
                .manager
                .session
                .observe_package(package.id, self.manager.observer_handle()),
        };
        self.state.packages.insert(package.id, observer_id);

        let current = self
            .manager
            .session
            .package(&package.id)
            .unwrap_or_else(|| package.clone());

        tracing::debug!(package = %current.name, assets = current.len(), "Tracking package");
        for id in current.asset_ids() {
            if self.manager.is_inert() {
                return;
            }
            self.track_asset(&id);
        }
    }

    /// Stop tracking a package, dropping every record it owns. Also ends the
    /// watch on a package that only owns explicitly tracked assets.
    pub(crate) fn untrack_package(&mut self, package: &Package) {
        let observer_id = match self.state.watched.remove(&package.id) {
            Some(observer_id) => observer_id,
            None => match self.state.packages.get(&package.id) {
                Some(observer_id) => *observer_id,
                None => return,
            },
        };
        self.manager.session.unobserve(observer_id);

        tracing::debug!(package = %package.name, "Untracking package");
        for id in self.owned_asset_ids(package) {
            self.untrack_asset(&id);
        }
        self.state.packages.remove(&package.id);
    }

    /// Assets listed in `package` plus tracked records that claim it as owner.
    fn owned_asset_ids(&self, package: &Package) -> Vec<AssetId> {
        let mut ids = package.asset_ids();
        ids.extend(
            self.state
                .records
                .values()
                .filter(|record| record.item.package == Some(package.id))
                .map(DependencyRecord::id)
                .filter(|id| !package.contains(id)),
        );
        ids
    }

    pub(crate) fn is_package_tracked(&self, package: &PackageId) -> bool {
        self.state.packages.contains_key(package)
    }

    // ---------------------------------------------------------------------
    // Assets
    // ---------------------------------------------------------------------

    /// Track an asset, returning whether a record exists afterwards.
    pub(crate) fn track_asset(&mut self, id: &AssetId) -> bool {
        if self.state.records.contains_key(id) {
            return true;
        }
        let Some(live) = self.manager.session.find_asset(id) else {
            return false;
        };
        self.insert_record(&live);
        if let Some(package) = live.package {
            self.watch_package(package);
        }
        self.update_edges(id);
        true
    }

    /// Receive asset notifications of an untracked package, so that an
    /// explicitly tracked asset is dropped when the session removes it.
    fn watch_package(&mut self, package: PackageId) {
        if self.is_package_tracked(&package) || self.state.watched.contains_key(&package) {
            return;
        }
        tracing::trace!(package = %package, "Watching package of an explicitly tracked asset");
        let observer_id = self
            .manager
            .session
            .observe_package(package, self.manager.observer_handle());
        self.state.watched.insert(package, observer_id);
    }

    /// End the watch on `package` once it owns no tracked record.
    fn release_watch(&mut self, package: PackageId) {
        if !self.state.watched.contains_key(&package) {
            return;
        }
        let still_owned = self
            .state
            .records
            .values()
            .any(|record| record.item.package == Some(package));
        if still_owned {
            return;
        }
        if let Some(observer_id) = self.state.watched.remove(&package) {
            self.manager.session.unobserve(observer_id);
        }
    }

    /// Create a record with no edges yet.
    fn insert_record(&mut self, live: &Arc<AssetItem>) {
        let snapshot = self.manager.snapshot(live);
        tracing::trace!(asset = %snapshot.id(), location = %snapshot.location, "Tracking asset");
        self.state
            .records
            .insert(snapshot.id(), DependencyRecord::new(snapshot));
    }

    pub(crate) fn untrack_asset(&mut self, id: &AssetId) -> bool {
        let Some(record) = self.state.records.remove(id) else {
            return false;
        };
        tracing::trace!(asset = %id, location = %record.item.location, "Untracking asset");

        self.state.missing.remove_record(&record);

        for target in record.links_out.keys() {
            if let Some(target) = self.state.records.get_mut(target) {
                target.remove_link_in(id);
            }
        }

        // Whoever pointed at the removed asset now points at a missing one.
        let reference = record.item.to_reference();
        for source_id in record.links_in.keys() {
            let Some(source) = self.state.records.get_mut(source_id) else {
                continue;
            };
            if let Some(link_type) = source.remove_link_out(id) {
                source.add_broken_link_out(reference.clone(), link_type);
            }
            self.update_missing_dependencies(source_id);
        }

        if let Some(package) = record.item.package {
            self.release_watch(package);
        }
        true
    }

    /// Replace a record's snapshot with the current session content and
    /// recompute its edges. Returns the new snapshot.
    pub(crate) fn refresh_asset(&mut self, id: &AssetId) -> Option<Arc<AssetItem>> {
        if !self.state.records.contains_key(id) {
            return None;
        }
        let live = self.manager.session.find_asset(id)?;
        let snapshot = self.manager.snapshot(&live);
        if let Some(record) = self.state.records.get_mut(id) {
            record.item = Arc::clone(&snapshot);
        }
        self.update_edges(id);
        Some(snapshot)
    }

    /// Recompute the outgoing edges of one record.
    pub(crate) fn update_edges(&mut self, id: &AssetId) {
        let Some(record) = self.state.records.get(id) else {
            return;
        };

        // 1. The record is about to get a fresh edge set.
        self.state.missing.remove_record(record);

        // 2. Detach the reciprocal side of the old resolved edges.
        let item = Arc::clone(&record.item);
        let old_targets: Vec<AssetId> = record.links_out.keys().copied().collect();
        for target in &old_targets {
            if let Some(target) = self.state.records.get_mut(target) {
                target.remove_link_in(id);
            }
        }

        // 3. One hop of discovery; resolve against the graph, then the session.
        let mut links_out: HashMap<AssetId, LinkType> = HashMap::default();
        let mut broken = Vec::new();
        for collected in self.manager.collector.collect(&item) {
            let target = collected.reference.id;
            if self.state.records.contains_key(&target) || self.discover(&target) {
                *links_out.entry(target).or_insert(LinkType::empty()) |= collected.link_type;
            } else {
                broken.push(collected);
            }
        }

        let Some(record) = self.state.records.get_mut(id) else {
            return;
        };
        record.links_out.clear();
        record.broken_links_out.clear();
        for (target, link_type) in &links_out {
            record.add_link_out(*target, *link_type);
        }
        for collected in broken {
            record.add_broken_link_out(collected.reference, collected.link_type);
        }

        // 4. Attach the reciprocal side of the new resolved edges.
        for (target, link_type) in links_out {
            if let Some(target) = self.state.records.get_mut(&target) {
                target.add_link_in(*id, link_type);
            }
        }

        // 5. Re-index broken links, and settle whoever was waiting on us.
        self.update_missing_dependencies(id);
    }

    /// Track a referenced asset that exists in a tracked package but has no
    /// record yet. Its own edges are deferred to `pending`.
    fn discover(&mut self, target: &AssetId) -> bool {
        let Some(live) = self.manager.session.find_asset(target) else {
            return false;
        };
        let tracked_owner = live
            .package
            .is_some_and(|package| self.is_package_tracked(&package));
        if !tracked_owner {
            return false;
        }
        self.insert_record(&live);
        self.pending.push(*target);
        self.discovered += 1;
        true
    }

    /// Index `id`'s broken links and resolve the records waiting on `id`.
    pub(crate) fn update_missing_dependencies(&mut self, id: &AssetId) {
        let Some(record) = self.state.records.get(id) else {
            return;
        };
        self.state.missing.insert_record(record);

        let waiting = self.state.missing.take_waiting_parents(id);
        for parent_id in waiting {
            let Some(parent) = self.state.records.get_mut(&parent_id) else {
                continue;
            };
            let Some(broken) = parent.remove_broken_link_out(id) else {
                continue;
            };
            parent.add_link_out(*id, broken.link_type);
            if !parent.has_broken_links() {
                self.state.missing.mark_complete(&parent_id);
            }
            if let Some(target) = self.state.records.get_mut(id) {
                target.add_link_in(parent_id, broken.link_type);
            }
            tracing::trace!(asset = %parent_id, target = %id, "Resolved missing reference");
        }
    }

    /// Detached view of a record's direct edges.
    pub(crate) fn view(&self, id: &AssetId) -> Option<AssetDependencies> {
        self.state.direct_view(id)
    }
}

impl DependencyManager {
    /// Snapshot a live asset. Read-only package assets are shared unless
    /// configured otherwise.
    pub(crate) fn snapshot(&self, live: &Arc<AssetItem>) -> Arc<AssetItem> {
        if !self.settings.clone_system_assets && self.session.is_system_asset(live) {
            Arc::clone(live)
        } else {
            self.cloner.snapshot(live)
        }
    }

    /// Run `apply` as one atomic graph mutation.
    ///
    /// Returns `None` without touching anything when the manager or its
    /// session is disposed. Change events raised by the mutation are
    /// delivered after the state borrow ends but before the lock is released.
    pub(crate) fn mutate<R>(&self, apply: impl FnOnce(&mut Mutation<'_>) -> R) -> Option<R> {
        let guard = self.state.lock();
        if self.is_inert() {
            return None;
        }

        let (result, events) = {
            let mut state = guard.borrow_mut();
            let mut mutation = Mutation::new(self, &mut state);
            let result = apply(&mut mutation);
            mutation.finish();
            (result, mutation.into_events())
        };

        if self.settings.verify_after_mutation {
            if let Err(err) = guard.borrow().verify() {
                tracing::error!("Dependency graph integrity check failed: {}", err);
            }
        }

        self.dispatch(&events);
        Some(result)
    }

    /// Start tracking a package and all of its assets.
    pub fn track_package(&self, package: &Package) {
        let _init = self.initialize();
        self.mutate(|m| m.track_package(package));
    }

    /// Stop tracking a package; its assets become missing for anyone
    /// referencing them.
    pub fn untrack_package(&self, package: &Package) {
        let _init = self.initialize();
        self.mutate(|m| m.untrack_package(package));
    }

    /// Track an asset of the session.
    ///
    /// Idempotent. Returns the asset's direct dependencies, or `None` if the
    /// session has no such asset.
    pub fn track_asset(&self, id: &AssetId) -> Option<AssetDependencies> {
        let _init = self.initialize();
        self.mutate(|m| if m.track_asset(id) { m.view(id) } else { None })
            .flatten()
    }

    /// Stop tracking an asset. Returns whether it was tracked.
    pub fn untrack_asset(&self, id: &AssetId) -> bool {
        let _init = self.initialize();
        self.mutate(|m| m.untrack_asset(id)).unwrap_or(false)
    }
}
