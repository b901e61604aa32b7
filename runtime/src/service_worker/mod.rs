//! Service Worker Module
//!
//! An offline-first caching worker: requests are classified, served by a
//! caching strategy against versioned cache partitions, and the partitions
//! are pre-populated on install and pruned on activation.
//!
//! ```text
//! WorkerEvent ──▶ ServiceWorker::dispatch
//!                   ├─ Install  ─▶ LifecycleController::install
//!                   ├─ Activate ─▶ LifecycleController::activate
//!                   ├─ Fetch    ─▶ RequestClassifier ─▶ StrategyEngine ─▶ CacheStore / Network
//!                   └─ Sync     ─▶ SyncManager
//! ```
//!
//! Fetch handling spawns background refreshes on the ambient tokio runtime.
//! Without one, refreshes are skipped and requests are still served.

mod background;
mod cache;
mod classify;
mod clients;
mod config;
mod error;
mod events;
mod fetch;
mod lifecycle;
mod network;
mod offline;
mod partitions;
mod strategy;
mod sync;

pub use background::*;
pub use cache::*;
pub use classify::*;
pub use clients::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use fetch::*;
pub use lifecycle::*;
pub use network::*;
pub use offline::{OfflineMutation, OfflineSnapshot};
pub use partitions::*;
pub use strategy::*;
pub use sync::*;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Service Worker global ID counter
static NEXT_SW_ID: AtomicU64 = AtomicU64::new(1);

/// Service Worker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceWorkerState {
    /// Constructed, install not yet run
    #[default]
    Parsed,
    Installing,
    /// Shell cached; eligible for activation
    Installed,
    Activating,
    /// Controlling clients
    Activated,
    /// Install failed or replaced
    Redundant,
}

/// Service Worker ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceWorkerId(u64);

impl ServiceWorkerId {
    /// Create a new unique ID
    pub fn new() -> Self {
        Self(NEXT_SW_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Get raw value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ServiceWorkerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A Service Worker instance
pub struct ServiceWorker {
    id: ServiceWorkerId,
    config: WorkerConfig,
    store: Arc<dyn CacheStore>,
    partitions: PartitionManager,
    classifier: RequestClassifier,
    engine: StrategyEngine,
    lifecycle: LifecycleController,
    clients: Arc<Clients>,
    sync: SyncManager,
    background: Arc<BackgroundTasks>,
}

impl ServiceWorker {
    /// Create a worker over a host-provided store and network
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
    ) -> WorkerResult<Self> {
        config.validate()?;

        let background = Arc::new(BackgroundTasks::new());
        let clients = Arc::new(Clients::new());
        let partitions = PartitionManager::new(&config);
        let classifier = RequestClassifier::new(&config)?;
        let engine = StrategyEngine::new(
            &config,
            Arc::clone(&store),
            Arc::clone(&network),
            Arc::clone(&background),
        )?;
        let lifecycle = LifecycleController::new(
            Arc::clone(&store),
            network,
            partitions.clone(),
            config.shell_urls()?,
            Arc::clone(&clients),
        );

        let sync = SyncManager::default();
        for tag in &config.sync_tags {
            sync.register(tag.clone());
        }

        Ok(Self {
            id: ServiceWorkerId::new(),
            config,
            store,
            partitions,
            classifier,
            engine,
            lifecycle,
            clients,
            sync,
            background,
        })
    }

    /// Create a worker backed by an in-memory store (quota from config)
    pub fn with_memory_store(config: WorkerConfig, network: Arc<dyn Network>) -> WorkerResult<Self> {
        let store: Arc<dyn CacheStore> = match config.quota_bytes {
            Some(quota) => Arc::new(MemoryCacheStore::with_quota(quota)),
            None => Arc::new(MemoryCacheStore::new()),
        };
        Self::new(config, store, network)
    }

    /// Replace the sync handler
    pub fn with_sync_handler(mut self, handler: Box<dyn SyncHandler>) -> Self {
        let sync = SyncManager::new(handler);
        for tag in self.sync.tags() {
            sync.register(tag);
        }
        self.sync = sync;
        self
    }

    pub fn id(&self) -> ServiceWorkerId {
        self.id
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn state(&self) -> ServiceWorkerState {
        self.lifecycle.state()
    }

    /// Check if the worker is active
    pub fn is_active(&self) -> bool {
        self.state() == ServiceWorkerState::Activated
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn partitions(&self) -> &PartitionManager {
        &self.partitions
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub fn sync_manager(&self) -> &SyncManager {
        &self.sync
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    /// Route an event to its handler
    pub async fn dispatch(&self, event: WorkerEvent) -> WorkerResult<EventOutcome> {
        match event {
            WorkerEvent::Install => self.install().await.map(EventOutcome::Installed),
            WorkerEvent::Activate => self.activate().await.map(EventOutcome::Activated),
            WorkerEvent::Fetch(request) => Ok(EventOutcome::Response(self.fetch(&request).await)),
            WorkerEvent::Sync(tag) => Ok(EventOutcome::Synced(self.sync.fire(&tag).await)),
        }
    }

    pub async fn install(&self) -> WorkerResult<usize> {
        self.lifecycle.install().await
    }

    pub async fn activate(&self) -> WorkerResult<PruneReport> {
        self.lifecycle.activate().await
    }

    /// Serve a request. Never fails: offline conditions resolve to a cached
    /// entry or a synthesized fallback.
    ///
    /// Background refreshes run on the current tokio runtime. Called outside
    /// one, this does not panic: refreshes are skipped and
    /// stale-while-revalidate misses are fetched inline.
    pub async fn fetch(&self, request: &Request) -> Served {
        let route = self.classifier.classify(request);
        self.engine.handle(request, route).await
    }

    /// Route chosen for `request`
    pub fn route(&self, request: &Request) -> Route {
        self.classifier.classify(request)
    }

    /// Wait for outstanding background cache writes
    pub async fn wait_until_idle(&self) {
        self.background.settle().await;
    }

    /// Background tasks still running
    pub fn pending_background(&self) -> usize {
        self.background.pending()
    }
}
