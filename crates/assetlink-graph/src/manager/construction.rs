//! Construction, lazy initialization and disposal.

use std::cell::RefCell;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use assetlink_config::{AssetLinkConfig, GraphSettings};
use assetlink_session::{
    AssetCloner, ContentReferenceCollector, DeepCloner, ReferenceCollector, Session, SessionObserver,
};
use parking_lot::{Mutex, ReentrantMutex};

use super::events::SubscriberRegistry;
use super::{DependencyManager, GraphGuard, GraphState, Mutation};
use crate::Result;

/// Builder for [`DependencyManager`].
pub struct DependencyManagerBuilder {
    session: Arc<Session>,
    settings: GraphSettings,
    collector: Arc<dyn ReferenceCollector>,
    cloner: Arc<dyn AssetCloner>,
}

impl DependencyManagerBuilder {
    pub fn settings(mut self, settings: GraphSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn collector(mut self, collector: Arc<dyn ReferenceCollector>) -> Self {
        self.collector = collector;
        self
    }

    pub fn cloner(mut self, cloner: Arc<dyn AssetCloner>) -> Self {
        self.cloner = cloner;
        self
    }

    /// Create the manager and register it with the session.
    ///
    /// If the session already holds a non-empty local package and eager
    /// initialization is enabled, the initial scan starts on a background
    /// thread. Queries issued meanwhile block until it completes.
    pub fn build(self) -> Arc<DependencyManager> {
        let manager = Arc::new_cyclic(|weak: &Weak<DependencyManager>| DependencyManager {
            session: self.session,
            settings: self.settings,
            collector: self.collector,
            cloner: self.cloner,
            state: ReentrantMutex::new(RefCell::new(GraphState::default())),
            subscribers: Mutex::new(SubscriberRegistry::default()),
            session_observer: Mutex::new(None),
            self_ref: weak.clone(),
            saving: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
        });

        let observer_id = manager.session.observe(manager.observer_handle());
        *manager.session_observer.lock() = Some(observer_id);

        if manager.settings.eager_initialization && manager.session_has_local_content() {
            manager.spawn_initialization();
        }

        manager
    }
}

impl DependencyManager {
    pub fn builder(session: Arc<Session>) -> DependencyManagerBuilder {
        DependencyManagerBuilder {
            session,
            settings: GraphSettings::default(),
            collector: Arc::new(ContentReferenceCollector),
            cloner: Arc::new(DeepCloner),
        }
    }

    /// Create a manager with the default collector and cloner.
    pub fn new(session: Arc<Session>, settings: GraphSettings) -> Arc<Self> {
        Self::builder(session).settings(settings).build()
    }

    /// Create a manager that discovers references with `collector`.
    pub fn with_collector(
        session: Arc<Session>,
        settings: GraphSettings,
        collector: Arc<dyn ReferenceCollector>,
    ) -> Arc<Self> {
        Self::builder(session)
            .settings(settings)
            .collector(collector)
            .build()
    }

    /// Create a manager configured from `assetlink.toml` and the environment.
    pub fn from_config(session: Arc<Session>, config_path: Option<&Path>) -> Result<Arc<Self>> {
        let config = AssetLinkConfig::load(config_path)?;
        Ok(Self::new(session, config.graph))
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    pub(crate) fn observer_handle(&self) -> Weak<dyn SessionObserver> {
        self.self_ref.clone()
    }

    fn session_has_local_content(&self) -> bool {
        self.session
            .packages()
            .iter()
            .any(|package| !package.is_system && !package.is_empty())
    }

    fn spawn_initialization(&self) {
        let weak = self.self_ref.clone();
        let spawned = std::thread::Builder::new()
            .name("assetlink-init".to_string())
            .spawn(move || {
                if let Some(manager) = weak.upgrade() {
                    drop(manager.initialize());
                }
            });
        if let Err(err) = spawned {
            tracing::warn!("Could not start background graph initialization, deferring: {}", err);
        }
    }

    /// Whether the manager or its session has been torn down.
    pub(crate) fn is_inert(&self) -> bool {
        self.is_disposed() || self.session.is_disposed()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Scan the session once, tracking every package.
    ///
    /// Idempotent. Returns the lock guard whether or not a scan happened, so
    /// `drop(manager.initialize())` is the way to wait for the graph to be
    /// ready. A disposal during the scan aborts it without marking the graph
    /// initialized.
    pub fn initialize(&self) -> GraphGuard<'_> {
        let guard = self.state.lock();
        if self.is_initialized() || self.is_inert() {
            return GraphGuard::new(guard, self.is_initialized());
        }

        let completed = {
            let mut state = guard.borrow_mut();
            let mut mutation = Mutation::new(self, &mut state);
            let mut completed = true;
            for package in self.session.packages() {
                if self.is_inert() {
                    completed = false;
                    break;
                }
                mutation.track_package(&package);
            }
            mutation.finish();
            completed
        };

        if completed {
            self.initialized.store(true, Ordering::SeqCst);
            let state = guard.borrow();
            tracing::debug!(
                packages = state.packages.len(),
                assets = state.records.len(),
                missing = state.missing.len(),
                "Dependency graph initialized"
            );
        } else {
            tracing::debug!("Dependency graph initialization aborted by disposal");
        }
        GraphGuard::new(guard, completed)
    }

    /// Whether the first full scan has completed. Does not take the graph
    /// lock.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Make the manager inert.
    ///
    /// Unregisters from the session and drops change subscribers; later
    /// queries return nothing and mutations do nothing. Graph memory is
    /// released when the manager itself is dropped.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(id) = self.session_observer.lock().take() {
            self.session.unobserve(id);
        }
        {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            let GraphState { packages, watched, .. } = &mut *state;
            for (_, observer_id) in packages.drain().chain(watched.drain()) {
                self.session.unobserve(observer_id);
            }
        }
        self.subscribers.lock().clear();
        tracing::debug!("Dependency manager disposed");
    }
}

impl Drop for DependencyManager {
    fn drop(&mut self) {
        if let Some(id) = self.session_observer.get_mut().take() {
            self.session.unobserve(id);
        }
        let GraphState { packages, watched, .. } = self.state.get_mut().get_mut();
        for (_, observer_id) in packages.drain().chain(watched.drain()) {
            self.session.unobserve(observer_id);
        }
    }
}
