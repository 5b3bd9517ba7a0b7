//! Change notifications with explicit registration.
//!
//! Observers are held weakly: dropping the observer is enough to stop
//! delivery, and dead registrations are pruned on the next dispatch.

use std::sync::{Arc, Weak};

use crate::asset::AssetItem;
use crate::id::PackageId;
use crate::package::Package;
use crate::session::Session;

/// Handle returned by a registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// A change to the session's package collection.
#[derive(Debug, Clone)]
pub enum PackageChange {
    Added(Package),
    Removed(Package),
    Replaced { old: Package, new: Package },
}

/// A change to one package's asset collection.
#[derive(Debug, Clone)]
pub enum AssetChange {
    Added(Arc<AssetItem>),
    Removed(Arc<AssetItem>),
    Replaced {
        old: Arc<AssetItem>,
        new: Arc<AssetItem>,
    },
    /// Every asset of the package was removed at once.
    Reset { removed: Vec<Arc<AssetItem>> },
}

/// Receives session notifications.
///
/// Notifications are delivered synchronously, in firing order, without the
/// session's data lock held, so observers may query the session.
pub trait SessionObserver: Send + Sync {
    fn packages_changed(&self, _session: &Session, _change: &PackageChange) {}

    fn assets_changed(&self, _session: &Session, _package: PackageId, _change: &AssetChange) {}

    fn dirty_changed(&self, _session: &Session, _item: &Arc<AssetItem>, _old: bool, _new: bool) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    /// Package collection and dirty-flag notifications.
    Session,
    /// Asset collection notifications of one package.
    Package(PackageId),
}

struct Registration {
    id: ObserverId,
    scope: Scope,
    observer: Weak<dyn SessionObserver>,
}

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    registrations: Vec<Registration>,
}

impl ObserverRegistry {
    pub(crate) fn register(&mut self, scope: Scope, observer: Weak<dyn SessionObserver>) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.registrations.push(Registration {
            id,
            scope,
            observer,
        });
        id
    }

    pub(crate) fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        before != self.registrations.len()
    }

    /// Live observers registered for `scope`. Dead entries are dropped.
    pub(crate) fn observers(&mut self, scope: Scope) -> Vec<Arc<dyn SessionObserver>> {
        self.registrations.retain(|r| r.observer.strong_count() > 0);
        self.registrations
            .iter()
            .filter(|r| r.scope == scope)
            .filter_map(|r| r.observer.upgrade())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }
}
