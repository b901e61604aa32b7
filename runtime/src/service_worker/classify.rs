//! Request Classification
//!
//! Maps each intercepted request to exactly one route: the strategy that
//! serves it, the partition it reads and writes, and what to answer when
//! both network and cache come up empty.

use hashbrown::HashSet;
use url::Url;

use super::config::{ApiReadPolicy, WorkerConfig};
use super::error::ConfigError;
use super::fetch::{Request, RequestDestination, RequestMethod};
use super::partitions::PartitionRole;

/// Caching strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve the cached entry; fetch and store only on a miss
    CacheFirst,
    /// Cache-first, plus a background refresh after every hit
    CacheFirstRevalidate,
    /// Fetch first; fall back to cache, then the offline page
    NetworkFirst,
    /// Fetch first; fall back to cache only
    NetworkFirstApi,
    /// Serve cached immediately while a fetch refreshes the entry
    StaleWhileRevalidate,
    /// Never touch the cache
    NetworkOnly,
}

/// Answer when nothing could be served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Empty 503
    Unavailable,
    /// The designated offline page, else a minimal offline notice
    OfflinePage,
    /// 200 JSON with empty collections
    ApiSnapshot,
    /// 503 JSON telling the caller to retry later
    ApiMutation,
}

/// Classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// How cache and network are consulted
    pub strategy: Strategy,
    /// Partition read from and written to
    pub partition: PartitionRole,
    /// Answer when nothing could be served
    pub fallback: Fallback,
}

impl Route {
    const fn new(strategy: Strategy, partition: PartitionRole, fallback: Fallback) -> Self {
        Self {
            strategy,
            partition,
            fallback,
        }
    }
}

/// API endpoint matcher: host plus path prefix
#[derive(Debug, Clone)]
struct ApiEndpoint {
    host: String,
    port: Option<u16>,
    path_prefix: String,
}

impl ApiEndpoint {
    fn from_url(url: &Url) -> Self {
        Self {
            host: url.host_str().unwrap_or_default().to_string(),
            port: url.port_or_known_default(),
            path_prefix: url.path().to_string(),
        }
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some(self.host.as_str())
            && url.port_or_known_default() == self.port
            && url.path().starts_with(&self.path_prefix)
    }
}

/// Request classifier
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    api: Option<ApiEndpoint>,
    api_reads: ApiReadPolicy,
    /// Resolved shell URLs, populated only when shell URLs are pinned
    shell: HashSet<String>,
    /// Hosts pinned wholesale to the shell partition
    shell_hosts: HashSet<String>,
}

impl RequestClassifier {
    pub fn new(config: &WorkerConfig) -> Result<Self, ConfigError> {
        let api = config.api_url()?.as_ref().map(ApiEndpoint::from_url);
        let shell = if config.shell_cache_first {
            config.shell_urls()?.into_iter().collect()
        } else {
            HashSet::new()
        };
        Ok(Self {
            api,
            api_reads: config.api_reads,
            shell,
            shell_hosts: config
                .shell_hosts
                .iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
        })
    }

    /// Pick the route for `request`. First match wins.
    pub fn classify(&self, request: &Request) -> Route {
        let parsed = Url::parse(&request.url).ok();

        if self.is_pinned(parsed.as_ref(), &request.url) {
            let fallback = if is_page(request) {
                Fallback::OfflinePage
            } else {
                Fallback::Unavailable
            };
            return Route::new(Strategy::CacheFirst, PartitionRole::Shell, fallback);
        }

        if let (Some(api), Some(url)) = (&self.api, &parsed) {
            if api.matches(url) {
                return self.api_route(request.method);
            }
        }

        let path = parsed
            .as_ref()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| request.url.clone());
        if request.is_navigation() || is_document_path(&path) {
            return Route::new(
                Strategy::NetworkFirst,
                PartitionRole::Dynamic,
                Fallback::OfflinePage,
            );
        }

        match request.destination {
            RequestDestination::Image => {
                Route::new(Strategy::CacheFirst, PartitionRole::Image, Fallback::Unavailable)
            }
            d if d.is_static_asset() => Route::new(
                Strategy::StaleWhileRevalidate,
                PartitionRole::Dynamic,
                Fallback::Unavailable,
            ),
            _ => Route::new(
                Strategy::CacheFirstRevalidate,
                PartitionRole::Dynamic,
                Fallback::Unavailable,
            ),
        }
    }

    fn is_pinned(&self, parsed: Option<&Url>, raw: &str) -> bool {
        if let Some(host) = parsed.and_then(Url::host_str) {
            if self.shell_hosts.contains(host) {
                return true;
            }
        }
        !self.shell.is_empty() && self.shell.contains(parsed.map(Url::as_str).unwrap_or(raw))
    }

    fn api_route(&self, method: RequestMethod) -> Route {
        if method != RequestMethod::Get {
            return Route::new(Strategy::NetworkOnly, PartitionRole::Api, Fallback::ApiMutation);
        }
        let strategy = match self.api_reads {
            ApiReadPolicy::CacheFirstRevalidate => Strategy::CacheFirstRevalidate,
            ApiReadPolicy::NetworkFirst => Strategy::NetworkFirstApi,
            ApiReadPolicy::NetworkOnly => Strategy::NetworkOnly,
        };
        Route::new(strategy, PartitionRole::Api, Fallback::ApiSnapshot)
    }
}

/// Top-level page loads, which fall back to the offline page
fn is_page(request: &Request) -> bool {
    request.is_navigation() || request.destination == RequestDestination::Document
}

fn is_document_path(path: &str) -> bool {
    path == "/" || path.ends_with(".html") || path.ends_with(".htm")
}
