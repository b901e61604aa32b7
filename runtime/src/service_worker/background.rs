//! Background Tasks
//!
//! Cache refreshes that outlive the request that started them. They are
//! spawned on the tokio runtime and tracked so the host can wait for them
//! (the equivalent of `event.waitUntil`), but their outcome never reaches the
//! caller that triggered them.
//!
//! Outside a tokio runtime there is nowhere to run them, so they are skipped.

use std::future::Future;

use spin::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Tracker for fire-and-forget work
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the current tokio runtime.
    ///
    /// Returns false, dropping the task, when called outside a runtime.
    pub fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                log::warn!("[SW] Skipping background task: {}", e);
                return false;
            }
        };
        let handle = runtime.spawn(task);
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        true
    }

    /// Number of tasks not yet finished
    pub fn pending(&self) -> usize {
        self.handles.lock().iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait until every task spawned so far, and any they spawn, has finished
    pub async fn settle(&self) {
        loop {
            let batch: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                if let Err(e) = handle.await {
                    log::debug!("[SW] Background task aborted: {}", e);
                }
            }
        }
    }
}
