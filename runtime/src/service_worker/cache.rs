//! Cache API Implementation
//!
//! Named partitions mapping a [`RequestKey`] to a stored [`Response`]. The
//! store is shared by every in-flight request; each operation is atomic per
//! key and concurrent writes to one key resolve last-writer-wins.

use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashMap;
use spin::RwLock;

use super::error::CacheError;
use super::fetch::{RequestKey, Response};

/// Cache store consumed by the worker (the host's `caches` object)
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the partition if it does not exist yet
    async fn open(&self, name: &str) -> Result<(), CacheError>;

    /// Check if a partition exists
    async fn has(&self, name: &str) -> bool;

    /// Look up an entry; a missing partition is simply a miss
    async fn get(&self, name: &str, key: &RequestKey) -> Result<Option<Response>, CacheError>;

    /// Store an entry, creating the partition on demand
    async fn put(&self, name: &str, key: RequestKey, response: Response)
        -> Result<(), CacheError>;

    /// Remove a single entry
    async fn delete_entry(&self, name: &str, key: &RequestKey) -> Result<bool, CacheError>;

    /// Delete a whole partition
    async fn delete(&self, name: &str) -> Result<bool, CacheError>;

    /// Partition names, in creation order
    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Entry keys of one partition, in insertion order
    async fn entry_keys(&self, name: &str) -> Result<Vec<RequestKey>, CacheError>;

    /// Match across every partition, oldest partition first
    async fn match_any(&self, key: &RequestKey) -> Result<Option<Response>, CacheError> {
        for name in self.keys().await? {
            if let Some(response) = self.get(&name, key).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

/// Handle to one named partition
#[derive(Clone)]
pub struct Partition {
    store: Arc<dyn CacheStore>,
    name: String,
}

impl Partition {
    /// Open (or create) the partition `name`
    pub async fn open(store: Arc<dyn CacheStore>, name: &str) -> Result<Self, CacheError> {
        store.open(name).await?;
        Ok(Self {
            store,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, key: &RequestKey) -> Result<Option<Response>, CacheError> {
        self.store.get(&self.name, key).await
    }

    pub async fn put(&self, key: RequestKey, response: Response) -> Result<(), CacheError> {
        self.store.put(&self.name, key, response).await
    }

    pub async fn delete(&self, key: &RequestKey) -> Result<bool, CacheError> {
        self.store.delete_entry(&self.name, key).await
    }

    pub async fn keys(&self) -> Result<Vec<RequestKey>, CacheError> {
        self.store.entry_keys(&self.name).await
    }
}

/// A cached response with its insertion sequence
#[derive(Debug, Clone)]
struct CacheEntry {
    seq: u64,
    response: Response,
    size: usize,
}

#[derive(Debug, Default)]
struct PartitionData {
    created: u64,
    entries: HashMap<RequestKey, CacheEntry>,
    next_seq: u64,
    total_size: usize,
}

impl PartitionData {
    fn insert(&mut self, key: RequestKey, response: Response) {
        let size = response.size();
        if let Some(old) = self.entries.remove(&key) {
            self.total_size = self.total_size.saturating_sub(old.size);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.total_size += size;
        self.entries.insert(key, CacheEntry {
            seq,
            response,
            size,
        });
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    partitions: HashMap<String, PartitionData>,
    next_created: u64,
}

impl StoreInner {
    fn open(&mut self, name: &str) -> &mut PartitionData {
        let next_created = &mut self.next_created;
        self.partitions
            .entry(name.to_string())
            .or_insert_with(|| {
                let created = *next_created;
                *next_created += 1;
                PartitionData {
                    created,
                    ..PartitionData::default()
                }
            })
    }

    fn usage(&self) -> usize {
        self.partitions.values().map(|p| p.total_size).sum()
    }
}

/// In-process cache store.
///
/// Locks are only held for the synchronous body of each operation, never
/// across an await point.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    inner: RwLock<StoreInner>,
    quota: Option<usize>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit total stored bytes across all partitions
    pub fn with_quota(quota: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            quota: Some(quota),
        }
    }

    /// Number of entries in a partition (0 if it does not exist)
    pub fn len(&self, name: &str) -> usize {
        self.inner
            .read()
            .partitions
            .get(name)
            .map(|p| p.entries.len())
            .unwrap_or(0)
    }

    /// Stored bytes across all partitions
    pub fn usage(&self) -> usize {
        self.inner.read().usage()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn open(&self, name: &str) -> Result<(), CacheError> {
        self.inner.write().open(name);
        Ok(())
    }

    async fn has(&self, name: &str) -> bool {
        self.inner.read().partitions.contains_key(name)
    }

    async fn get(&self, name: &str, key: &RequestKey) -> Result<Option<Response>, CacheError> {
        Ok(self
            .inner
            .read()
            .partitions
            .get(name)
            .and_then(|p| p.entries.get(key))
            .map(|e| e.response.clone()))
    }

    async fn put(
        &self,
        name: &str,
        key: RequestKey,
        response: Response,
    ) -> Result<(), CacheError> {
        let mut inner = self.inner.write();
        if let Some(quota) = self.quota {
            let replaced = inner
                .partitions
                .get(name)
                .and_then(|p| p.entries.get(&key))
                .map(|e| e.size)
                .unwrap_or(0);
            let used = inner.usage() - replaced;
            let requested = response.size();
            if used + requested > quota {
                return Err(CacheError::QuotaExceeded {
                    used,
                    requested,
                    quota,
                });
            }
        }
        inner.open(name).insert(key, response);
        Ok(())
    }

    async fn delete_entry(&self, name: &str, key: &RequestKey) -> Result<bool, CacheError> {
        let mut inner = self.inner.write();
        let partition = inner
            .partitions
            .get_mut(name)
            .ok_or_else(|| CacheError::NotFound(name.to_string()))?;
        match partition.entries.remove(key) {
            Some(old) => {
                partition.total_size = partition.total_size.saturating_sub(old.size);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        Ok(self.inner.write().partitions.remove(name).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let inner = self.inner.read();
        let mut names: Vec<(&String, u64)> = inner
            .partitions
            .iter()
            .map(|(name, p)| (name, p.created))
            .collect();
        names.sort_by_key(|(_, created)| *created);
        Ok(names.into_iter().map(|(name, _)| name.clone()).collect())
    }

    async fn entry_keys(&self, name: &str) -> Result<Vec<RequestKey>, CacheError> {
        let inner = self.inner.read();
        let partition = inner
            .partitions
            .get(name)
            .ok_or_else(|| CacheError::NotFound(name.to_string()))?;
        let mut entries: Vec<(&RequestKey, u64)> = partition
            .entries
            .iter()
            .map(|(key, e)| (key, e.seq))
            .collect();
        entries.sort_by_key(|(_, seq)| *seq);
        Ok(entries.into_iter().map(|(key, _)| key.clone()).collect())
    }
}
