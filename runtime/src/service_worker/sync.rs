//! Background Sync
//!
//! Tags registered for background sync and the handler invoked when the host
//! fires one. The stock handler does nothing yet: it marks where a durable
//! queue of pending actions would be replayed.

use std::collections::BTreeSet;

use async_trait::async_trait;
use spin::RwLock;

/// Handler for a fired sync tag
#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn sync(&self, tag: &str);
}

/// Pending-actions replay. Currently a no-op.
#[derive(Debug, Default)]
pub struct PendingActionsSync;

#[async_trait]
impl SyncHandler for PendingActionsSync {
    async fn sync(&self, tag: &str) {
        log::info!("[SW] Background sync triggered for {} - nothing queued", tag);
    }
}

/// Sync manager for a service worker
pub struct SyncManager {
    tags: RwLock<BTreeSet<String>>,
    handler: Box<dyn SyncHandler>,
}

impl SyncManager {
    pub fn new(handler: Box<dyn SyncHandler>) -> Self {
        Self {
            tags: RwLock::new(BTreeSet::new()),
            handler,
        }
    }

    /// Register a tag; returns false if it was already registered
    pub fn register(&self, tag: impl Into<String>) -> bool {
        self.tags.write().insert(tag.into())
    }

    pub fn unregister(&self, tag: &str) -> bool {
        self.tags.write().remove(tag)
    }

    /// Get all tags
    pub fn tags(&self) -> Vec<String> {
        self.tags.read().iter().cloned().collect()
    }

    /// Run the handler for `tag`. Unknown tags are ignored.
    pub async fn fire(&self, tag: &str) -> bool {
        if !self.tags.read().contains(tag) {
            log::debug!("[SW] Ignoring sync for unregistered tag {}", tag);
            return false;
        }
        self.handler.sync(tag).await;
        true
    }
}

impl Default for SyncManager {
    fn default() -> Self {
        Self::new(Box::new(PendingActionsSync))
    }
}
