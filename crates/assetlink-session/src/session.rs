//! The live, mutable collection of packages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::asset::{Asset, AssetItem};
use crate::error::{Result, SessionError};
use crate::id::{AssetId, PackageId};
use crate::observer::{AssetChange, ObserverId, ObserverRegistry, PackageChange, Scope, SessionObserver};
use crate::package::Package;

/// A session: the packages being worked on, plus change notifications.
///
/// Every mutation updates the data under a write lock, releases it, then
/// notifies observers. Mutations are serialized by a re-entrant dispatch
/// lock, so notifications arrive in the order the changes were applied and
/// an observer may itself mutate the session from within a callback.
pub struct Session {
    packages: RwLock<IndexMap<PackageId, Package>>,
    observers: Mutex<ObserverRegistry>,
    dispatch: ReentrantMutex<()>,
    disposed: AtomicBool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("packages", &self.packages.read().len())
            .field("observers", &self.observers.lock().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            packages: RwLock::new(IndexMap::new()),
            observers: Mutex::new(ObserverRegistry::default()),
            dispatch: ReentrantMutex::new(()),
            disposed: AtomicBool::new(false),
        }
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    /// Register for package collection and dirty-flag notifications.
    pub fn observe(&self, observer: Weak<dyn SessionObserver>) -> ObserverId {
        self.observers.lock().register(Scope::Session, observer)
    }

    /// Register for asset collection notifications of one package.
    pub fn observe_package(&self, package: PackageId, observer: Weak<dyn SessionObserver>) -> ObserverId {
        self.observers.lock().register(Scope::Package(package), observer)
    }

    pub fn unobserve(&self, id: ObserverId) -> bool {
        self.observers.lock().unregister(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    fn observers_for(&self, scope: Scope) -> Vec<Arc<dyn SessionObserver>> {
        self.observers.lock().observers(scope)
    }

    fn notify_packages(&self, change: PackageChange) {
        for observer in self.observers_for(Scope::Session) {
            observer.packages_changed(self, &change);
        }
    }

    fn notify_assets(&self, package: PackageId, change: AssetChange) {
        for observer in self.observers_for(Scope::Package(package)) {
            observer.assets_changed(self, package, &change);
        }
    }

    fn notify_dirty(&self, item: &Arc<AssetItem>, old: bool, new: bool) {
        for observer in self.observers_for(Scope::Session) {
            observer.dirty_changed(self, item, old, new);
        }
    }

    // ---------------------------------------------------------------------
    // Lifetime
    // ---------------------------------------------------------------------

    /// Mark the session as torn down. Later mutations fail with
    /// [`SessionError::Disposed`]; observers should treat it as a signal to stop.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_disposed() {
            Err(SessionError::Disposed)
        } else {
            Ok(())
        }
    }

    // ---------------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------------

    pub fn find_asset(&self, id: &AssetId) -> Option<Arc<AssetItem>> {
        self.packages
            .read()
            .values()
            .find_map(|package| package.get(id).cloned())
    }

    pub fn package(&self, id: &PackageId) -> Option<Package> {
        self.packages.read().get(id).cloned()
    }

    pub fn packages(&self) -> Vec<Package> {
        self.packages.read().values().cloned().collect()
    }

    pub fn package_ids(&self) -> Vec<PackageId> {
        self.packages.read().keys().copied().collect()
    }

    /// Whether the owning package of `item` is read-only.
    pub fn is_system_asset(&self, item: &AssetItem) -> bool {
        item.package
            .and_then(|id| self.packages.read().get(&id).map(|p| p.is_system))
            .unwrap_or(false)
    }

    fn owner_of(packages: &IndexMap<PackageId, Package>, id: &AssetId) -> Option<PackageId> {
        packages
            .iter()
            .find(|(_, package)| package.contains(id))
            .map(|(package_id, _)| *package_id)
    }

    // ---------------------------------------------------------------------
    // Package collection
    // ---------------------------------------------------------------------

    pub fn add_package(&self, package: Package) -> Result<()> {
        self.ensure_alive()?;
        let _dispatch = self.dispatch.lock();
        {
            let mut packages = self.packages.write();
            if packages.contains_key(&package.id) {
                return Err(SessionError::DuplicatePackage(package.id));
            }
            for item in package.assets() {
                if Self::owner_of(&packages, &item.id()).is_some() {
                    return Err(SessionError::DuplicateAsset(item.id()));
                }
            }
            packages.insert(package.id, package.clone());
        }
        tracing::debug!(package = %package.name, assets = package.len(), "Package added to session");
        self.notify_packages(PackageChange::Added(package));
        Ok(())
    }

    pub fn remove_package(&self, id: &PackageId) -> Result<Package> {
        self.ensure_alive()?;
        let _dispatch = self.dispatch.lock();
        let removed = self
            .packages
            .write()
            .shift_remove(id)
            .ok_or(SessionError::PackageNotFound(*id))?;
        tracing::debug!(package = %removed.name, "Package removed from session");
        self.notify_packages(PackageChange::Removed(removed.clone()));
        Ok(removed)
    }

    /// Swap the package `old` for `new`, keeping its position.
    pub fn replace_package(&self, old: &PackageId, new: Package) -> Result<Package> {
        self.ensure_alive()?;
        let _dispatch = self.dispatch.lock();
        let previous = {
            let mut packages = self.packages.write();
            let index = packages
                .get_index_of(old)
                .ok_or(SessionError::PackageNotFound(*old))?;
            if new.id != *old && packages.contains_key(&new.id) {
                return Err(SessionError::DuplicatePackage(new.id));
            }
            let previous = packages
                .shift_remove(old)
                .ok_or(SessionError::PackageNotFound(*old))?;
            packages.shift_insert(index, new.id, new.clone());
            previous
        };
        self.notify_packages(PackageChange::Replaced {
            old: previous.clone(),
            new,
        });
        Ok(previous)
    }

    // ---------------------------------------------------------------------
    // Asset collection
    // ---------------------------------------------------------------------

    pub fn add_asset(&self, package: &PackageId, item: AssetItem) -> Result<Arc<AssetItem>> {
        self.ensure_alive()?;
        let _dispatch = self.dispatch.lock();
        let added = {
            let mut packages = self.packages.write();
            if Self::owner_of(&packages, &item.id()).is_some() {
                return Err(SessionError::DuplicateAsset(item.id()));
            }
            let target = packages
                .get_mut(package)
                .ok_or(SessionError::PackageNotFound(*package))?;
            if target.is_system {
                return Err(SessionError::ReadOnlyPackage(*package));
            }
            target.insert(item)
        };
        tracing::trace!(asset = %added.id(), location = %added.location, "Asset added");
        self.notify_assets(*package, AssetChange::Added(Arc::clone(&added)));
        Ok(added)
    }

    pub fn remove_asset(&self, id: &AssetId) -> Result<Arc<AssetItem>> {
        self.ensure_alive()?;
        let _dispatch = self.dispatch.lock();
        let (package, removed) = {
            let mut packages = self.packages.write();
            let package = Self::owner_of(&packages, id).ok_or(SessionError::AssetNotFound(*id))?;
            let target = packages
                .get_mut(&package)
                .ok_or(SessionError::PackageNotFound(package))?;
            if target.is_system {
                return Err(SessionError::ReadOnlyPackage(package));
            }
            let removed = target.take(id).ok_or(SessionError::AssetNotFound(*id))?;
            (package, removed)
        };
        tracing::trace!(asset = %id, "Asset removed");
        self.notify_assets(package, AssetChange::Removed(Arc::clone(&removed)));
        Ok(removed)
    }

    /// Replace an asset wholesale with a new item carrying the same id, as
    /// happens when an asset is reloaded from disk.
    pub fn replace_asset(&self, item: AssetItem) -> Result<Arc<AssetItem>> {
        self.ensure_alive()?;
        let _dispatch = self.dispatch.lock();
        let id = item.id();
        let (package, old, new) = {
            let mut packages = self.packages.write();
            let package = Self::owner_of(&packages, &id).ok_or(SessionError::AssetNotFound(id))?;
            let target = packages
                .get_mut(&package)
                .ok_or(SessionError::PackageNotFound(package))?;
            if target.is_system {
                return Err(SessionError::ReadOnlyPackage(package));
            }
            let old = target.take(&id).ok_or(SessionError::AssetNotFound(id))?;
            let new = target.insert(item);
            (package, old, new)
        };
        self.notify_assets(
            package,
            AssetChange::Replaced {
                old,
                new: Arc::clone(&new),
            },
        );
        Ok(new)
    }

    /// Remove every asset of a package in one notification.
    pub fn reset_assets(&self, package: &PackageId) -> Result<Vec<Arc<AssetItem>>> {
        self.ensure_alive()?;
        let _dispatch = self.dispatch.lock();
        let removed = {
            let mut packages = self.packages.write();
            let target = packages
                .get_mut(package)
                .ok_or(SessionError::PackageNotFound(*package))?;
            if target.is_system {
                return Err(SessionError::ReadOnlyPackage(*package));
            }
            target.drain()
        };
        self.notify_assets(
            *package,
            AssetChange::Reset {
                removed: removed.clone(),
            },
        );
        Ok(removed)
    }

    // ---------------------------------------------------------------------
    // Content and dirty state
    // ---------------------------------------------------------------------

    /// Edit an asset's content in place.
    ///
    /// Bumps the version, marks the asset dirty and fires a dirty-changed
    /// notification. Handles previously returned for this asset keep seeing
    /// the old content.
    pub fn edit_asset<F>(&self, id: &AssetId, edit: F) -> Result<Arc<AssetItem>>
    where
        F: FnOnce(&mut Asset),
    {
        self.ensure_alive()?;
        let _dispatch = self.dispatch.lock();
        let (updated, was_dirty) = {
            let mut packages = self.packages.write();
            let package = Self::owner_of(&packages, id).ok_or(SessionError::AssetNotFound(*id))?;
            let target = packages
                .get_mut(&package)
                .ok_or(SessionError::PackageNotFound(package))?;
            if target.is_system {
                return Err(SessionError::ReadOnlyPackage(package));
            }
            let slot = target.get_mut(id).ok_or(SessionError::AssetNotFound(*id))?;
            let item = Arc::make_mut(slot);
            edit(&mut item.asset);
            // The id is the asset's identity; an edit cannot change it.
            item.asset.id = *id;
            item.version += 1;
            let was_dirty = item.is_dirty;
            item.is_dirty = true;
            (Arc::clone(slot), was_dirty)
        };
        self.notify_dirty(&updated, was_dirty, true);
        Ok(updated)
    }

    /// Set an asset's dirty flag, notifying observers even if the value is
    /// unchanged.
    pub fn set_dirty(&self, id: &AssetId, is_dirty: bool) -> Result<()> {
        self.ensure_alive()?;
        let _dispatch = self.dispatch.lock();
        let (updated, old) = {
            let mut packages = self.packages.write();
            let package = Self::owner_of(&packages, id).ok_or(SessionError::AssetNotFound(*id))?;
            let slot = packages
                .get_mut(&package)
                .and_then(|p| p.get_mut(id))
                .ok_or(SessionError::AssetNotFound(*id))?;
            let old = slot.is_dirty;
            if old != is_dirty {
                Arc::make_mut(slot).is_dirty = is_dirty;
            }
            (Arc::clone(slot), old)
        };
        self.notify_dirty(&updated, old, is_dirty);
        Ok(())
    }

    /// Clear the dirty flag of every asset, as a save does.
    ///
    /// Returns the ids that were dirty.
    pub fn mark_all_clean(&self) -> Result<Vec<AssetId>> {
        self.ensure_alive()?;
        let _dispatch = self.dispatch.lock();
        let cleaned = {
            let mut packages = self.packages.write();
            let mut cleaned = Vec::new();
            for package in packages.values_mut() {
                for id in package.asset_ids() {
                    if let Some(slot) = package.get_mut(&id) {
                        if slot.is_dirty {
                            Arc::make_mut(slot).is_dirty = false;
                            cleaned.push(Arc::clone(slot));
                        }
                    }
                }
            }
            cleaned
        };
        for item in &cleaned {
            self.notify_dirty(item, true, false);
        }
        Ok(cleaned.iter().map(|item| item.id()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::AssetReference;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl SessionObserver for Recorder {
        fn packages_changed(&self, _session: &Session, change: &PackageChange) {
            let label = match change {
                PackageChange::Added(p) => format!("package+ {}", p.name),
                PackageChange::Removed(p) => format!("package- {}", p.name),
                PackageChange::Replaced { old, new } => format!("package~ {}->{}", old.name, new.name),
            };
            self.events.lock().push(label);
        }

        fn assets_changed(&self, _session: &Session, _package: PackageId, change: &AssetChange) {
            let label = match change {
                AssetChange::Added(item) => format!("asset+ {}", item.location),
                AssetChange::Removed(item) => format!("asset- {}", item.location),
                AssetChange::Replaced { new, .. } => format!("asset~ {}", new.location),
                AssetChange::Reset { removed } => format!("reset {}", removed.len()),
            };
            self.events.lock().push(label);
        }

        fn dirty_changed(&self, _session: &Session, item: &Arc<AssetItem>, old: bool, new: bool) {
            self.events
                .lock()
                .push(format!("dirty {} {}->{}", item.location, old, new));
        }
    }

    fn observed_session() -> (Session, Arc<Recorder>) {
        let session = Session::new();
        let recorder = Arc::new(Recorder::default());
        let weak: Weak<dyn SessionObserver> = Arc::downgrade(&recorder) as Weak<dyn SessionObserver>;
        session.observe(weak);
        (session, recorder)
    }

    #[test]
    fn test_package_notifications_in_order() {
        let (session, recorder) = observed_session();
        let game = Package::new("game");
        let game_id = game.id;
        session.add_package(game).unwrap();
        session.remove_package(&game_id).unwrap();

        assert_eq!(*recorder.events.lock(), vec!["package+ game", "package- game"]);
    }

    #[test]
    fn test_asset_notifications_only_reach_package_observers() {
        let (session, recorder) = observed_session();
        let game = Package::new("game");
        let game_id = game.id;
        session.add_package(game).unwrap();

        let item = session
            .add_asset(&game_id, AssetItem::builder("a").build())
            .unwrap();
        assert_eq!(recorder.events.lock().len(), 1);

        let weak: Weak<dyn SessionObserver> = Arc::downgrade(&recorder) as Weak<dyn SessionObserver>;
        session.observe_package(game_id, weak);
        session.remove_asset(&item.id()).unwrap();

        assert_eq!(recorder.events.lock().last().unwrap(), "asset- a");
    }

    #[test]
    fn test_edit_bumps_version_and_keeps_old_handles_intact() {
        let (session, recorder) = observed_session();
        let game = Package::new("game");
        let game_id = game.id;
        session.add_package(game).unwrap();
        let before = session
            .add_asset(&game_id, AssetItem::builder("a").build())
            .unwrap();

        let target = AssetReference::new(AssetId::new(), "b");
        let after = session
            .edit_asset(&before.id(), |asset| asset.content.set("link", target.clone()))
            .unwrap();

        assert_eq!(after.version, 1);
        assert!(after.is_dirty);
        assert_eq!(before.version, 0);
        assert!(before.asset.content.get("link").is_none());
        assert_eq!(recorder.events.lock().last().unwrap(), "dirty a false->true");
    }

    #[test]
    fn test_mark_all_clean_reports_dirty_assets() {
        let (session, recorder) = observed_session();
        let game = Package::new("game")
            .with_asset(AssetItem::builder("a").dirty(true).build())
            .with_asset(AssetItem::builder("b").build());
        session.add_package(game).unwrap();

        let cleaned = session.mark_all_clean().unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(recorder.events.lock().last().unwrap(), "dirty a true->false");
    }

    #[test]
    fn test_system_packages_reject_mutation() {
        let session = Session::new();
        let core = Package::system("core").with_asset(AssetItem::builder("a").build());
        let core_id = core.id;
        let id = core.asset_ids()[0];
        session.add_package(core).unwrap();

        assert_eq!(
            session.add_asset(&core_id, AssetItem::builder("b").build()),
            Err(SessionError::ReadOnlyPackage(core_id))
        );
        assert!(session.edit_asset(&id, |_| {}).is_err());
        assert!(session.is_system_asset(&session.find_asset(&id).unwrap()));
    }

    #[test]
    fn test_duplicate_asset_ids_rejected() {
        let session = Session::new();
        let item = AssetItem::builder("a").build();
        let id = item.id();
        let game = Package::new("game").with_asset(item.clone());
        let game_id = game.id;
        session.add_package(game).unwrap();

        assert_eq!(
            session.add_asset(&game_id, item),
            Err(SessionError::DuplicateAsset(id))
        );
    }

    #[test]
    fn test_disposed_session_rejects_mutation() {
        let session = Session::new();
        session.dispose();
        assert_eq!(
            session.add_package(Package::new("late")),
            Err(SessionError::Disposed)
        );
    }

    #[test]
    fn test_dropped_observers_are_pruned() {
        let (session, recorder) = observed_session();
        assert_eq!(session.observer_count(), 1);
        drop(recorder);
        session.add_package(Package::new("game")).unwrap();
        assert_eq!(session.observer_count(), 0);
    }
}
