//! Cache Partitions
//!
//! Partition names are derived from the config's version tag. Rotating the
//! version yields a fresh set of names; anything else found in the store is
//! stale and removed on activation.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use hashbrown::HashSet;

use super::cache::{CacheStore, Partition};
use super::config::{PartitionLayout, WorkerConfig};
use super::error::CacheError;

/// Partition role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionRole {
    /// App shell pre-cached at install
    Shell,
    /// Pages and sub-resources cached on demand
    Dynamic,
    Image,
    /// Last known API data
    Api,
}

impl PartitionRole {
    pub const ALL: [PartitionRole; 4] = [Self::Shell, Self::Dynamic, Self::Image, Self::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shell => "static",
            Self::Dynamic => "dynamic",
            Self::Image => "image",
            Self::Api => "api",
        }
    }
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names that survive activation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpectedPartitionSet(HashSet<String>);

impl ExpectedPartitionSet {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExpectedPartitionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Outcome of a cleanup pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PruneReport {
    /// Partitions removed
    pub deleted: Vec<String>,
    /// Partitions whose deletion failed; left in place
    pub failed: Vec<String>,
}

/// Owns the versioned partition names
#[derive(Debug, Clone)]
pub struct PartitionManager {
    prefix: String,
    version: String,
    layout: PartitionLayout,
}

impl PartitionManager {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            prefix: config.cache_prefix.clone(),
            version: config.version.clone(),
            layout: config.layout,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Partition name for a role under the current version
    pub fn name(&self, role: PartitionRole) -> String {
        match self.layout {
            PartitionLayout::Split => format!("{}-{}-{}", self.prefix, role, self.version),
            PartitionLayout::Single => format!("{}-{}", self.prefix, self.version),
        }
    }

    /// Every name referenced by the current version
    pub fn expected(&self) -> ExpectedPartitionSet {
        PartitionRole::ALL.iter().map(|role| self.name(*role)).collect()
    }

    /// Open the partition for `role`
    pub async fn open(
        &self,
        store: &Arc<dyn CacheStore>,
        role: PartitionRole,
    ) -> Result<Partition, CacheError> {
        Partition::open(Arc::clone(store), &self.name(role)).await
    }

    /// Delete every partition not referenced by the current version
    pub async fn prune(&self, store: &Arc<dyn CacheStore>) -> Result<PruneReport, CacheError> {
        prune_except(store, &self.expected()).await
    }
}

/// Delete every partition whose name is not in `expected`.
///
/// Deletions run concurrently. A failed deletion is logged and reported but
/// does not stop the others.
pub async fn prune_except(
    store: &Arc<dyn CacheStore>,
    expected: &ExpectedPartitionSet,
) -> Result<PruneReport, CacheError> {
    let stale: Vec<String> = store
        .keys()
        .await?
        .into_iter()
        .filter(|name| !expected.contains(name))
        .collect();

    let results = join_all(stale.iter().map(|name| {
        log::info!("[SW] Deleting old cache: {}", name);
        store.delete(name)
    }))
    .await;

    let mut report = PruneReport::default();
    for (name, result) in stale.into_iter().zip(results) {
        match result {
            Ok(_) => report.deleted.push(name),
            Err(e) => {
                log::warn!("[SW] Failed to delete cache {}: {}", name, e);
                report.failed.push(name);
            }
        }
    }
    Ok(report)
}
