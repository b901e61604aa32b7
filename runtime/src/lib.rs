//! Offline Worker Runtime
//!
//! This crate implements an offline-first caching worker for a progressive web
//! application. The worker sits between the page and the network and decides,
//! per request, whether to answer from a local cache, from the network, or
//! from both.
//!
//! # Architecture
//!
//! - `service_worker::config`: `WorkerConfig` (version tag, app shell, API endpoint, presets)
//! - `service_worker::cache`: `CacheStore` trait + in-memory store of named partitions
//! - `service_worker::partitions`: versioned partition names + stale partition cleanup
//! - `service_worker::classify`: request → (strategy, partition, fallback)
//! - `service_worker::strategy`: cache-first, network-first, stale-while-revalidate, network-only
//! - `service_worker::lifecycle`: install (shell pre-cache), activate (prune + claim)
//! - `service_worker::events`: event variants routed by `ServiceWorker::dispatch`
//! - `service_worker::sync`: background sync tags (no-op handler)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sw_runtime::service_worker::{MemoryNetwork, Request, ServiceWorker, WorkerConfig};
//!
//! # async fn run() -> Result<(), sw_runtime::service_worker::WorkerError> {
//! let mut config = WorkerConfig::new("https://app.example", "v1");
//! config.app_shell = vec!["/".into(), "/index.html".into()];
//!
//! let sw = ServiceWorker::with_memory_store(config, Arc::new(MemoryNetwork::new()))?;
//! sw.install().await?;
//! sw.activate().await?;
//! let served = sw.fetch(&Request::navigate("https://app.example/")).await;
//! println!("{} from {:?}", served.response.status, served.source);
//! # Ok(())
//! # }
//! ```

pub mod service_worker;

pub use service_worker::{Request, Response, ServiceWorker, WorkerConfig, WorkerError, WorkerEvent};
