//! Service Worker Lifecycle Management
//!
//! Install pre-populates the app shell, activate prunes stale partitions and
//! claims clients. State transitions are validated; a failed install leaves
//! the worker redundant and the previous instance in charge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::try_join_all;
use spin::RwLock;

use super::cache::{CacheStore, Partition};
use super::clients::Clients;
use super::error::{WorkerError, WorkerResult};
use super::fetch::{Request, RequestKey, Response};
use super::network::Network;
use super::partitions::{PartitionManager, PartitionRole, PruneReport};
use super::ServiceWorkerState;

/// Lifecycle controller
pub struct LifecycleController {
    state: RwLock<ServiceWorkerState>,
    skip_waiting: AtomicBool,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    partitions: PartitionManager,
    shell: Vec<String>,
    clients: Arc<Clients>,
}

impl LifecycleController {
    pub fn new(
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
        partitions: PartitionManager,
        shell: Vec<String>,
        clients: Arc<Clients>,
    ) -> Self {
        Self {
            state: RwLock::new(ServiceWorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            store,
            network,
            partitions,
            shell,
            clients,
        }
    }

    /// Get current state
    pub fn state(&self) -> ServiceWorkerState {
        *self.state.read()
    }

    /// Installed and waiting for older instances to go away
    pub fn is_waiting(&self) -> bool {
        self.state() == ServiceWorkerState::Installed && !self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether activation may proceed without waiting
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Transition worker state
    pub fn transition(&self, to: ServiceWorkerState) -> WorkerResult<()> {
        let mut state = self.state.write();
        let from = *state;
        if !is_valid_transition(from, to) {
            return Err(WorkerError::InvalidStateTransition { from, to });
        }
        *state = to;
        log::debug!("[SW] State {:?} -> {:?}", from, to);
        Ok(())
    }

    /// Pre-cache the app shell.
    ///
    /// Every entry is fetched before anything is written, so a single failed
    /// entry leaves no shell partition behind. Returns the number of entries
    /// stored.
    pub async fn install(&self) -> WorkerResult<usize> {
        self.transition(ServiceWorkerState::Installing)?;
        log::info!(
            "[SW] Installing {} - caching {} shell entries",
            self.partitions.version(),
            self.shell.len()
        );

        match self.precache().await {
            Ok(count) => {
                self.transition(ServiceWorkerState::Installed)?;
                self.skip_waiting();
                Ok(count)
            }
            Err(e) => {
                log::error!("[SW] Install failed: {}", e);
                self.transition(ServiceWorkerState::Redundant)?;
                Err(e)
            }
        }
    }

    async fn precache(&self) -> WorkerResult<usize> {
        let network = &self.network;
        let fetched: Vec<(Request, Response)> =
            try_join_all(self.shell.iter().map(|url| async move {
                let request = Request::new(url.clone());
                match network.fetch(&request).await {
                    Ok(response) if response.ok() => Ok((request, response)),
                    Ok(response) => Err(WorkerError::InstallFailed {
                        url: url.clone(),
                        reason: format!("HTTP {}", response.status),
                    }),
                    Err(e) => Err(WorkerError::InstallFailed {
                        url: url.clone(),
                        reason: e.to_string(),
                    }),
                }
            }))
            .await?;

        let name = self.partitions.name(PartitionRole::Shell);
        let existed = self.store.has(&name).await;
        let shell = self.partitions.open(&self.store, PartitionRole::Shell).await?;

        let mut added = Vec::new();
        for (request, response) in &fetched {
            let key = request.key();
            let present = matches!(shell.get(&key).await, Ok(Some(_)));
            if let Err(e) = shell.put(key.clone(), response.clone()).await {
                self.rollback(&shell, existed, &added).await;
                return Err(e.into());
            }
            if !present {
                added.push(key);
            }
        }
        Ok(fetched.len())
    }

    /// Undo a partial shell write. A partition this install created is
    /// dropped; one that was already there (same version tag, possibly in
    /// use) only loses the entries this install added.
    async fn rollback(&self, shell: &Partition, existed: bool, added: &[RequestKey]) {
        if !existed {
            if let Err(e) = self.store.delete(shell.name()).await {
                log::warn!("[SW] Failed to drop partial shell {}: {}", shell.name(), e);
            }
            return;
        }
        for key in added {
            if let Err(e) = shell.delete(key).await {
                log::warn!("[SW] Failed to roll back {} in {}: {}", key, shell.name(), e);
            }
        }
    }

    /// Activate without waiting for older instances to finish
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    /// Drop stale partitions, then take control of every client.
    ///
    /// Deletion failures are logged and do not block activation.
    pub async fn activate(&self) -> WorkerResult<PruneReport> {
        self.transition(ServiceWorkerState::Activating)?;

        let report = match self.partitions.prune(&self.store).await {
            Ok(report) => report,
            Err(e) => {
                log::warn!("[SW] Could not list caches during activation: {}", e);
                PruneReport::default()
            }
        };

        self.transition(ServiceWorkerState::Activated)?;
        self.claim()?;
        log::info!(
            "[SW] Activated {} ({} stale caches removed)",
            self.partitions.version(),
            report.deleted.len()
        );
        Ok(report)
    }

    /// Claim clients (take control of all pages in scope)
    pub fn claim(&self) -> WorkerResult<usize> {
        let state = self.state();
        if state != ServiceWorkerState::Activated {
            return Err(WorkerError::InvalidStateTransition {
                from: state,
                to: ServiceWorkerState::Activated,
            });
        }
        let claimed = self.clients.claim();
        log::info!("[SW] Claimed {} clients", claimed);
        Ok(claimed)
    }

    /// Retire this worker
    pub fn make_redundant(&self) -> WorkerResult<()> {
        self.transition(ServiceWorkerState::Redundant)
    }
}

/// Check if a state transition is valid
fn is_valid_transition(from: ServiceWorkerState, to: ServiceWorkerState) -> bool {
    use ServiceWorkerState::*;

    matches!(
        (from, to),
        (Parsed, Installing)
            | (Installing, Installed)
            | (Installing, Redundant)
            | (Installed, Activating)
            | (Installed, Redundant)
            | (Activating, Activated)
            | (Activating, Redundant)
            | (Activated, Redundant)
    )
}
