//! The [`ObjectBackend`] trait: the object-storage client contract.
//!
//! Retry, authentication and connection pooling belong to the
//! implementation behind this trait. The query store issues exactly one
//! call per operation and never retries.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use pq_types::StorageKey;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::BackendResult;

/// Upper bound on the capacity pre-allocated from an advertised length.
const MAX_PREALLOCATE: u64 = 1024 * 1024;

/// Body of an object returned by [`ObjectBackend::get`].
pub struct ObjectBody {
    content_length: Option<u64>,
    reader: Pin<Box<dyn AsyncRead + Send>>,
}

impl ObjectBody {
    /// Wrap a streaming reader. `content_length` is a sizing hint only.
    pub fn new(reader: impl AsyncRead + Send + 'static, content_length: Option<u64>) -> Self {
        Self {
            content_length,
            reader: Box::pin(reader),
        }
    }

    /// A body backed by bytes already in memory.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let len = data.len() as u64;
        Self::new(std::io::Cursor::new(data), Some(len))
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Drain the body into `buffer`, returning the number of bytes read.
    ///
    /// `buffer` is cleared first so callers can reuse one allocation across
    /// reads.
    pub async fn read_into(mut self, buffer: &mut Vec<u8>) -> std::io::Result<usize> {
        buffer.clear();
        if let Some(len) = self.content_length {
            buffer.reserve(len.min(MAX_PREALLOCATE) as usize);
        }
        self.reader.read_to_end(buffer).await
    }
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Remote object storage addressed by bucket and key.
///
/// Implementations must be thread-safe and must treat `put` as atomic: a
/// reader sees either the previous object or the complete new one.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Check whether a bucket exists and is accessible.
    async fn bucket_exists(&self, bucket: &str) -> BackendResult<bool>;

    /// Fetch an object.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on transport, permission or I/O failure.
    async fn get(&self, bucket: &str, key: &StorageKey) -> BackendResult<Option<ObjectBody>>;

    /// Store an object, replacing any existing object at `key`.
    async fn put(&self, bucket: &str, key: &StorageKey, data: Bytes) -> BackendResult<()>;
}

#[async_trait]
impl<B: ObjectBackend + ?Sized> ObjectBackend for Arc<B> {
    async fn bucket_exists(&self, bucket: &str) -> BackendResult<bool> {
        (**self).bucket_exists(bucket).await
    }

    async fn get(&self, bucket: &str, key: &StorageKey) -> BackendResult<Option<ObjectBody>> {
        (**self).get(bucket, key).await
    }

    async fn put(&self, bucket: &str, key: &StorageKey, data: Bytes) -> BackendResult<()> {
        (**self).put(bucket, key, data).await
    }
}

#[async_trait]
impl<B: ObjectBackend + ?Sized> ObjectBackend for Box<B> {
    async fn bucket_exists(&self, bucket: &str) -> BackendResult<bool> {
        (**self).bucket_exists(bucket).await
    }

    async fn get(&self, bucket: &str, key: &StorageKey) -> BackendResult<Option<ObjectBody>> {
        (**self).get(bucket, key).await
    }

    async fn put(&self, bucket: &str, key: &StorageKey, data: Bytes) -> BackendResult<()> {
        (**self).put(bucket, key, data).await
    }
}
