//! Service Worker error types

use thiserror::Error;

/// Cache storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Partition does not exist
    #[error("cache partition not found: {0}")]
    NotFound(String),
    /// Storing the entry would exceed the configured quota
    #[error("cache quota exceeded ({used} + {requested} > {quota} bytes)")]
    QuotaExceeded {
        used: usize,
        requested: usize,
        quota: usize,
    },
    /// Backend failure
    #[error("cache storage error: {0}")]
    Storage(String),
}

/// Network fetch failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// Host has no connectivity
    #[error("network unreachable")]
    Offline,
    /// Request failed before a response was produced
    #[error("fetch failed: {0}")]
    Failed(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("version tag must not be empty")]
    EmptyVersion,
}

/// Worker-level errors
#[derive(Debug, Error)]
pub enum WorkerError {
    /// App shell pre-population failed; the worker never becomes ready
    #[error("install failed: {url}: {reason}")]
    InstallFailed { url: String, reason: String },
    /// Lifecycle event arrived in the wrong state
    #[error("invalid state transition {from:?} -> {to:?}")]
    InvalidStateTransition {
        from: super::ServiceWorkerState,
        to: super::ServiceWorkerState,
    },
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type WorkerResult<T> = Result<T, WorkerError>;
