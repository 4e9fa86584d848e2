//! Composition helpers: one store, two capability handles.

use std::sync::Arc;

use tracing::info;

use crate::backend::ObjectBackend;
use crate::config::{AccessMode, BackendConfig, StorageConfig};
use crate::error::QueryStoreResult;
use crate::fs::FileSystemBackend;
use crate::memory::InMemoryBackend;
use crate::storage::ObjectQueryStorage;
use crate::traits::{ReadStoredQueries, WriteStoredQueries};

/// A type-erased backend, as produced from configuration.
pub type DynBackend = Arc<dyn ObjectBackend>;

/// A validated store from which read-only and read-write handles are cut.
///
/// Every handle shares the same underlying [`ObjectQueryStorage`].
pub struct QueryStorage<B> {
    store: Arc<ObjectQueryStorage<B>>,
}

impl<B> Clone for QueryStorage<B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<B: ObjectBackend + 'static> QueryStorage<B> {
    /// Validate `bucket` on `backend` and wrap the resulting store.
    pub async fn connect(backend: B, bucket: impl Into<String>) -> QueryStoreResult<Self> {
        let store = ObjectQueryStorage::connect(backend, bucket).await?;
        Ok(Self::from_store(store))
    }

    pub fn from_store(store: ObjectQueryStorage<B>) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &ObjectQueryStorage<B> {
        &self.store
    }

    /// Lookup-only handle.
    pub fn read_only(&self) -> Arc<dyn ReadStoredQueries> {
        self.store.clone()
    }

    /// Lookup and registration handle.
    pub fn read_write(&self) -> Arc<dyn WriteStoredQueries> {
        self.store.clone()
    }

    /// The registration handle if `mode` permits writes.
    pub fn writer_for(&self, mode: AccessMode) -> Option<Arc<dyn WriteStoredQueries>> {
        mode.allows_writes().then(|| self.read_write())
    }
}

/// Build the backend described by `config`.
pub async fn open_backend(config: &StorageConfig) -> QueryStoreResult<DynBackend> {
    config.validate()?;
    let backend: DynBackend = match &config.backend {
        BackendConfig::Memory => Arc::new(InMemoryBackend::with_bucket(&config.bucket)),
        BackendConfig::Filesystem { root } => Arc::new(FileSystemBackend::new(root)),
        #[cfg(feature = "s3")]
        BackendConfig::S3 {
            region,
            endpoint,
            force_path_style,
        } => Arc::new(
            crate::s3::S3Backend::from_env(region.clone(), endpoint.clone(), *force_path_style)
                .await,
        ),
        #[cfg(not(feature = "s3"))]
        BackendConfig::S3 { .. } => {
            return Err(crate::error::ConfigError::UnsupportedBackend("s3").into())
        }
    };
    Ok(backend)
}

/// Build the configured backend and validate its bucket.
pub async fn open_storage(config: &StorageConfig) -> QueryStoreResult<QueryStorage<DynBackend>> {
    let backend = open_backend(config).await?;
    let storage = QueryStorage::connect(backend, config.bucket.clone()).await?;
    info!(
        backend = config.backend.name(),
        bucket = %config.bucket,
        mode = ?config.mode,
        "persisted query storage ready"
    );
    Ok(storage)
}
