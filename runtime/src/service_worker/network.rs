//! Network Access
//!
//! The worker reaches the network only through the [`Network`] trait, so the
//! host decides how requests actually leave the process.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use hashbrown::{HashMap, HashSet};
use spin::RwLock;

use super::error::NetworkError;
use super::fetch::{Request, Response};

/// Network fetch API consumed by the worker
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform a request. Any HTTP status is a successful fetch; only
    /// transport failures are errors.
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// In-process origin serving a fixed route table.
///
/// Unknown URLs answer 404. The whole network can be taken offline, or single
/// URLs made to fail, which is how offline behaviour is exercised.
pub struct MemoryNetwork {
    routes: RwLock<HashMap<String, Response>>,
    failing: RwLock<HashSet<String>>,
    fetches: RwLock<HashMap<String, usize>>,
    online: AtomicBool,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            fetches: RwLock::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }

    /// Serve `response` for `url`, replacing any previous route
    pub fn route(&self, url: impl Into<String>, response: Response) {
        self.routes.write().insert(url.into(), response);
    }

    /// Builder form of [`route`](Self::route)
    pub fn with_route(self, url: impl Into<String>, response: Response) -> Self {
        self.route(url, response);
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Make fetches of `url` fail even while online
    pub fn fail(&self, url: impl Into<String>) {
        self.failing.write().insert(url.into());
    }

    /// Number of fetch attempts made for `url`, including failed ones
    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.read().get(url).copied().unwrap_or(0)
    }

    /// Total fetch attempts across all URLs
    pub fn total_fetches(&self) -> usize {
        self.fetches.read().values().sum()
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Network for MemoryNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        *self.fetches.write().entry(request.url.clone()).or_insert(0) += 1;

        if !self.is_online() {
            return Err(NetworkError::Offline);
        }
        if self.failing.read().contains(&request.url) {
            return Err(NetworkError::Failed(format!("{} refused", request.url)));
        }

        Ok(self
            .routes
            .read()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Response::new(404)))
    }
}
