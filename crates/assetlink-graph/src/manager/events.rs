//! Session notifications, save bracketing and asset-changed subscribers.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use assetlink_session::{AssetChange, AssetItem, PackageChange, PackageId, Session, SessionObserver};

use super::DependencyManager;

/// Fired when the content of a tracked asset changed and its edges were
/// recomputed.
#[derive(Debug, Clone)]
pub struct AssetChangedEvent {
    /// The refreshed snapshot, as the graph now holds it.
    pub item: Arc<AssetItem>,
    pub old_dirty: bool,
    pub new_dirty: bool,
}

/// Handle for [`DependencyManager::unsubscribe_asset_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&AssetChangedEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
}

impl SubscriberRegistry {
    fn subscribe(&mut self, subscriber: Subscriber) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push((id, subscriber));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    /// Copy of the current subscribers, so callbacks run without the
    /// registry locked.
    fn current(&self) -> Vec<Subscriber> {
        self.subscribers.iter().map(|(_, s)| Arc::clone(s)).collect()
    }

    pub(crate) fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}

impl DependencyManager {
    /// Call `subscriber` after every content refresh of a tracked asset.
    ///
    /// Subscribers run on the mutating thread with the graph lock held; they
    /// may query the manager but other threads wait until they return.
    pub fn subscribe_asset_changed<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&AssetChangedEvent) + Send + Sync + 'static,
    {
        self.subscribers.lock().subscribe(Arc::new(subscriber))
    }

    pub fn unsubscribe_asset_changed(&self, id: SubscriptionId) -> bool {
        self.subscribers.lock().unsubscribe(id)
    }

    pub(crate) fn dispatch(&self, events: &[AssetChangedEvent]) {
        if events.is_empty() {
            return;
        }
        let subscribers = self.subscribers.lock().current();
        for event in events {
            for subscriber in &subscribers {
                subscriber(event);
            }
        }
    }

    /// Ignore dirty-flag notifications until [`end_saving_session`] is
    /// called. A save only clears flags; the content is unchanged.
    ///
    /// [`end_saving_session`]: Self::end_saving_session
    pub fn begin_saving_session(&self) {
        self.saving.store(true, Ordering::SeqCst);
    }

    pub fn end_saving_session(&self) {
        self.saving.store(false, Ordering::SeqCst);
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    fn on_asset_added(&self, package: PackageId, item: &Arc<AssetItem>) {
        let id = item.id();
        self.mutate(|m| {
            // A watched package only reports removals of its tracked assets.
            if m.is_package_tracked(&package) {
                m.track_asset(&id);
            }
        });
    }

    fn on_asset_removed(&self, item: &Arc<AssetItem>) {
        let id = item.id();
        self.mutate(|m| {
            m.untrack_asset(&id);
        });
    }

    fn on_asset_replaced(&self, package: PackageId, old: &Arc<AssetItem>, new: &Arc<AssetItem>) {
        let (old_id, new_id) = (old.id(), new.id());
        let (old_dirty, new_dirty) = (old.is_dirty, new.is_dirty);
        self.mutate(|m| {
            let was_tracked = m.untrack_asset(&old_id);
            if !was_tracked && !m.is_package_tracked(&package) {
                return;
            }
            if !m.track_asset(&new_id) || !was_tracked {
                return;
            }
            let snapshot = m.state().records.get(&new_id).map(|record| Arc::clone(&record.item));
            if let Some(item) = snapshot {
                m.push_event(AssetChangedEvent {
                    item,
                    old_dirty,
                    new_dirty,
                });
            }
        });
    }

    fn on_dirty_changed(&self, item: &Arc<AssetItem>, old_dirty: bool, new_dirty: bool) {
        if self.is_saving() {
            return;
        }
        let id = item.id();
        let package = item.package;
        self.mutate(|m| {
            if m.state().records.contains_key(&id) {
                if let Some(item) = m.refresh_asset(&id) {
                    m.push_event(AssetChangedEvent {
                        item,
                        old_dirty,
                        new_dirty,
                    });
                }
            } else if package.is_some_and(|package| m.is_package_tracked(&package)) {
                m.track_asset(&id);
            }
        });
    }
}

impl SessionObserver for DependencyManager {
    /// Handled whether or not the first scan has run; it skips packages that
    /// are already tracked.
    fn packages_changed(&self, _session: &Session, change: &PackageChange) {
        let initialized = self.is_initialized();
        self.mutate(|m| match change {
            PackageChange::Added(package) => m.track_package(package),
            PackageChange::Removed(package) => m.untrack_package(package),
            PackageChange::Replaced { old, new } => {
                // A package explicitly untracked after the first scan stays so.
                let was_tracked = m.is_package_tracked(&old.id);
                m.untrack_package(old);
                if was_tracked || !initialized {
                    m.track_package(new);
                }
            }
        });
    }

    fn assets_changed(&self, _session: &Session, package: PackageId, change: &AssetChange) {
        tracing::trace!(package = %package, "Asset collection changed");
        match change {
            AssetChange::Added(item) => self.on_asset_added(package, item),
            AssetChange::Removed(item) => self.on_asset_removed(item),
            AssetChange::Replaced { old, new } => self.on_asset_replaced(package, old, new),
            AssetChange::Reset { removed } => {
                self.mutate(|m| {
                    for item in removed {
                        m.untrack_asset(&item.id());
                    }
                });
            }
        }
    }

    fn dirty_changed(&self, _session: &Session, item: &Arc<AssetItem>, old: bool, new: bool) {
        self.on_dirty_changed(item, old, new);
    }
}
