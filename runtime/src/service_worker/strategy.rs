//! Caching Strategies
//!
//! Each strategy serves one request against one partition. Network failures
//! never escape: the engine resolves them to a cached entry or to the route's
//! fallback response.
//!
//! Only GET requests answered with a plain 200 are written to a cache.

use std::sync::Arc;

use tokio::sync::oneshot;

use super::background::BackgroundTasks;
use super::cache::CacheStore;
use super::classify::{Fallback, Route, Strategy};
use super::config::WorkerConfig;
use super::error::{ConfigError, NetworkError};
use super::fetch::{Request, RequestKey, RequestMethod, Response};
use super::network::Network;
use super::offline;
use super::partitions::PartitionManager;

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Fresh network response
    Network,
    /// Stored copy
    Cache,
    /// Synthesized or offline page
    Fallback,
}

/// A response handed back to the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    /// Response for the page
    pub response: Response,
    /// Where the response came from
    pub source: FetchSource,
}

impl Served {
    fn network(response: Response) -> Self {
        Self {
            response,
            source: FetchSource::Network,
        }
    }

    fn cache(response: Response) -> Self {
        Self {
            response,
            source: FetchSource::Cache,
        }
    }

    fn fallback(response: Response) -> Self {
        Self {
            response,
            source: FetchSource::Fallback,
        }
    }
}

/// Strategy engine
pub struct StrategyEngine {
    /// Shared cache store
    store: Arc<dyn CacheStore>,
    /// Host network
    network: Arc<dyn Network>,
    /// Maps route roles to partition names
    partitions: PartitionManager,
    /// Refreshes that outlive the request
    background: Arc<BackgroundTasks>,
    /// Key of the designated offline page
    offline_page: RequestKey,
    /// Message carried by the API read snapshot
    offline_message: String,
    /// Message carried by the API write error
    mutation_message: String,
}

impl StrategyEngine {
    pub fn new(
        config: &WorkerConfig,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
        background: Arc<BackgroundTasks>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            store,
            network,
            partitions: PartitionManager::new(config),
            background,
            offline_page: RequestKey::get(config.offline_page_url()?),
            offline_message: config.offline_message.clone(),
            mutation_message: config.mutation_offline_message.clone(),
        })
    }

    /// Serve `request` along `route`
    pub async fn handle(&self, request: &Request, route: Route) -> Served {
        let partition = self.partitions.name(route.partition);
        let result = match route.strategy {
            Strategy::CacheFirst => self.cache_first(&partition, request, false).await,
            Strategy::CacheFirstRevalidate => self.cache_first(&partition, request, true).await,
            Strategy::NetworkFirst => self.network_first(&partition, request, true).await,
            Strategy::NetworkFirstApi => self.network_first(&partition, request, false).await,
            Strategy::StaleWhileRevalidate => {
                self.stale_while_revalidate(&partition, request).await
            }
            Strategy::NetworkOnly => self.network.fetch(request).await.map(Served::network),
        };

        match result {
            Ok(served) => {
                log::debug!(
                    "[SW] {} {} -> {} ({:?})",
                    request.method,
                    request.url,
                    served.response.status,
                    served.source
                );
                served
            }
            Err(e) => {
                log::debug!("[SW] {} {} failed: {}", request.method, request.url, e);
                Served::fallback(self.fallback(route.fallback).await)
            }
        }
    }

    async fn cache_first(
        &self,
        partition: &str,
        request: &Request,
        revalidate: bool,
    ) -> Result<Served, NetworkError> {
        if let Some(hit) = self.lookup(partition, &request.key()).await {
            if revalidate {
                self.revalidate(partition, request);
            }
            return Ok(Served::cache(hit));
        }

        let response = self.network.fetch(request).await?;
        store_copy(&self.store, partition, request, &response).await;
        Ok(Served::network(response))
    }

    async fn network_first(
        &self,
        partition: &str,
        request: &Request,
        search_all: bool,
    ) -> Result<Served, NetworkError> {
        match self.network.fetch(request).await {
            Ok(response) => {
                store_copy(&self.store, partition, request, &response).await;
                Ok(Served::network(response))
            }
            Err(e) => {
                let key = request.key();
                if let Some(hit) = self.lookup(partition, &key).await {
                    return Ok(Served::cache(hit));
                }
                if search_all {
                    if let Some(hit) = self.lookup_any(&key).await {
                        return Ok(Served::cache(hit));
                    }
                }
                Err(e)
            }
        }
    }

    async fn stale_while_revalidate(
        &self,
        partition: &str,
        request: &Request,
    ) -> Result<Served, NetworkError> {
        let (tx, rx) = oneshot::channel();
        let spawned = {
            let store = Arc::clone(&self.store);
            let network = Arc::clone(&self.network);
            let partition = partition.to_string();
            let request = request.clone();
            self.background.spawn(async move {
                let result = network.fetch(&request).await;
                match &result {
                    Ok(fresh) => store_copy(&store, &partition, &request, fresh).await,
                    Err(e) => log::debug!("[SW] Revalidation of {} failed: {}", request.url, e),
                }
                // Receiver is gone once a cached copy was served
                let _ = tx.send(result);
            })
        };

        if let Some(hit) = self.lookup(partition, &request.key()).await {
            return Ok(Served::cache(hit));
        }

        if !spawned {
            let response = self.network.fetch(request).await?;
            store_copy(&self.store, partition, request, &response).await;
            return Ok(Served::network(response));
        }

        match rx.await {
            Ok(result) => result.map(Served::network),
            Err(_) => Err(NetworkError::Failed("revalidation task aborted".to_string())),
        }
    }

    /// Refresh the cached entry without blocking the caller
    fn revalidate(&self, partition: &str, request: &Request) {
        let store = Arc::clone(&self.store);
        let network = Arc::clone(&self.network);
        let partition = partition.to_string();
        let request = request.clone();
        self.background.spawn(async move {
            match network.fetch(&request).await {
                Ok(fresh) => store_copy(&store, &partition, &request, &fresh).await,
                Err(e) => log::debug!("[SW] Background refresh of {} failed: {}", request.url, e),
            }
        });
    }

    async fn fallback(&self, fallback: Fallback) -> Response {
        match fallback {
            Fallback::Unavailable => offline::unavailable(),
            Fallback::OfflinePage => match self.lookup_any(&self.offline_page).await {
                Some(page) => page,
                None => offline::notice(),
            },
            Fallback::ApiSnapshot => offline::api_snapshot(&self.offline_message),
            Fallback::ApiMutation => offline::api_mutation(&self.mutation_message),
        }
    }

    /// Cache read; storage errors count as a miss
    async fn lookup(&self, partition: &str, key: &RequestKey) -> Option<Response> {
        match self.store.get(partition, key).await {
            Ok(hit) => hit,
            Err(e) => {
                log::warn!("[SW] Cache read {} in {} failed: {}", key, partition, e);
                None
            }
        }
    }

    async fn lookup_any(&self, key: &RequestKey) -> Option<Response> {
        match self.store.match_any(key).await {
            Ok(hit) => hit,
            Err(e) => {
                log::warn!("[SW] Cache match {} failed: {}", key, e);
                None
            }
        }
    }
}

/// Store a copy of `response` if it is cacheable. Write failures are logged
/// and dropped.
async fn store_copy(
    store: &Arc<dyn CacheStore>,
    partition: &str,
    request: &Request,
    response: &Response,
) {
    if request.method != RequestMethod::Get || !response.is_cacheable() {
        return;
    }
    if let Err(e) = store.put(partition, request.key(), response.clone()).await {
        log::warn!("[SW] Cache write {} to {} failed: {}", request.url, partition, e);
    }
}
