use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use pq_types::StorageKey;

use crate::backend::{ObjectBackend, ObjectBody};
use crate::error::{BackendError, BackendResult};

type Buckets = HashMap<String, HashMap<String, Bytes>>;

/// In-memory, HashMap-based object backend.
///
/// Intended for tests and embedding. Buckets must be created explicitly,
/// mirroring object stores where a bucket is provisioned out of band.
pub struct InMemoryBackend {
    buckets: RwLock<Buckets>,
}

impl InMemoryBackend {
    /// Create a backend with no buckets.
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Create a backend with one empty bucket.
    pub fn with_bucket(bucket: &str) -> Self {
        let backend = Self::new();
        backend.create_bucket(bucket);
        backend
    }

    /// Create `bucket` if it does not exist yet.
    pub fn create_bucket(&self, bucket: &str) {
        self.write_lock()
            .entry(bucket.to_string())
            .or_default();
    }

    /// Number of objects in `bucket` (zero if the bucket does not exist).
    pub fn len(&self, bucket: &str) -> usize {
        self.read_lock().get(bucket).map_or(0, HashMap::len)
    }

    /// Returns `true` if no bucket holds any object.
    pub fn is_empty(&self) -> bool {
        self.read_lock().values().all(HashMap::is_empty)
    }

    /// Raw bytes stored at `key`, bypassing the query layer.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.read_lock().get(bucket)?.get(key).cloned()
    }

    /// Store raw bytes at `key`, creating the bucket if needed.
    pub fn insert_raw(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.write_lock()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data.into());
    }

    /// Sorted keys of every object in `bucket`.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .read_lock()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    // A poisoned lock only means another thread panicked mid-insert; the
    // map itself is still consistent.
    fn read_lock(&self) -> RwLockReadGuard<'_, Buckets> {
        self.buckets.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Buckets> {
        self.buckets.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectBackend for InMemoryBackend {
    async fn bucket_exists(&self, bucket: &str) -> BackendResult<bool> {
        Ok(self.read_lock().contains_key(bucket))
    }

    async fn get(&self, bucket: &str, key: &StorageKey) -> BackendResult<Option<ObjectBody>> {
        let buckets = self.read_lock();
        let objects = buckets.get(bucket).ok_or_else(|| missing_bucket(bucket))?;
        Ok(objects.get(key.as_str()).cloned().map(ObjectBody::from_bytes))
    }

    async fn put(&self, bucket: &str, key: &StorageKey, data: Bytes) -> BackendResult<()> {
        let mut buckets = self.write_lock();
        let objects = buckets.get_mut(bucket).ok_or_else(|| missing_bucket(bucket))?;
        objects.insert(key.as_str().to_string(), data);
        Ok(())
    }
}

fn missing_bucket(bucket: &str) -> BackendError {
    BackendError::Unavailable(format!("no such bucket: {bucket}"))
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buckets = self.read_lock();
        f.debug_struct("InMemoryBackend")
            .field("bucket_count", &buckets.len())
            .field("object_count", &buckets.values().map(HashMap::len).sum::<usize>())
            .finish()
    }
}
