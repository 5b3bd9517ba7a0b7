//! The dependency graph manager.
//!
//! Methods are spread across files by concern, each adding an `impl` block:
//!
//! - `construction` - building, lazy initialization, disposal
//! - `tracking` - track/untrack and the incremental edge update
//! - `events` - session notifications, save bracketing, change subscribers
//! - `queries` - dependency queries and missing-reference lookups
//! - `integrity` - invariant checking
//! - `statistics` - graph counters

mod construction;
mod events;
mod integrity;
mod queries;
mod statistics;
mod tracking;

use std::cell::{Ref, RefCell};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};

use assetlink_config::GraphSettings;
use assetlink_session::{AssetCloner, AssetId, ObserverId, PackageId, ReferenceCollector, Session};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use rustc_hash::FxHashMap as HashMap;

use crate::missing::MissingReferenceIndex;
use crate::record::DependencyRecord;

pub use construction::DependencyManagerBuilder;
pub use events::{AssetChangedEvent, SubscriptionId};
pub use statistics::GraphStatistics;

pub(crate) use tracking::Mutation;

/// Everything guarded by the manager's lock.
#[derive(Debug, Default)]
pub(crate) struct GraphState {
    pub(crate) records: HashMap<AssetId, DependencyRecord>,
    /// Tracked packages and their asset-notification registrations.
    pub(crate) packages: HashMap<PackageId, ObserverId>,
    /// Untracked packages owning an explicitly tracked asset. Registered only
    /// so the asset's removal reaches the graph.
    pub(crate) watched: HashMap<PackageId, ObserverId>,
    pub(crate) missing: MissingReferenceIndex,
}

/// Maintains the dependency graph of a [`Session`].
///
/// One re-entrant lock guards all graph state. Every query and mutation holds
/// it for its whole duration, so no caller ever observes a half-updated
/// record. Asset-changed subscribers run while the lock is held but after the
/// state has been released, which lets them call back into queries.
///
/// The [`ReferenceCollector`] and [`AssetCloner`] run while the state is
/// borrowed for a mutation. They must not call back into the manager, apart
/// from [`is_initialized`](Self::is_initialized),
/// [`is_disposed`](Self::is_disposed) and [`is_saving`](Self::is_saving).
pub struct DependencyManager {
    pub(crate) session: Arc<Session>,
    pub(crate) settings: GraphSettings,
    pub(crate) collector: Arc<dyn ReferenceCollector>,
    pub(crate) cloner: Arc<dyn AssetCloner>,
    pub(crate) state: ReentrantMutex<RefCell<GraphState>>,
    pub(crate) subscribers: Mutex<events::SubscriberRegistry>,
    pub(crate) session_observer: Mutex<Option<ObserverId>>,
    pub(crate) self_ref: Weak<DependencyManager>,
    pub(crate) saving: AtomicBool,
    pub(crate) disposed: AtomicBool,
    pub(crate) initialized: AtomicBool,
}

impl std::fmt::Debug for DependencyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyManager")
            .field("settings", &self.settings)
            .field("initialized", &self.is_initialized())
            .field("disposed", &self.is_disposed())
            .field("saving", &self.is_saving())
            .field("subscribers", &self.subscribers.lock().len())
            .finish_non_exhaustive()
    }
}

/// Proof that the manager is initialized, holding its lock.
///
/// Returned by [`DependencyManager::initialize`]. Other threads block on the
/// graph until it is dropped; the holding thread may keep calling the
/// manager.
pub struct GraphGuard<'a> {
    guard: ReentrantMutexGuard<'a, RefCell<GraphState>>,
    initialized: bool,
}

impl<'a> GraphGuard<'a> {
    pub(crate) fn new(guard: ReentrantMutexGuard<'a, RefCell<GraphState>>, initialized: bool) -> Self {
        Self { guard, initialized }
    }

    pub(crate) fn state(&self) -> Ref<'_, GraphState> {
        self.guard.borrow()
    }

    /// Whether the first full scan has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
