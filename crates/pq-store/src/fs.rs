use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use pq_types::StorageKey;
use tempfile::NamedTempFile;
use tokio::fs;

use crate::backend::{ObjectBackend, ObjectBody};
use crate::error::{BackendError, BackendResult};

/// Local-filesystem object backend.
///
/// Each bucket is a directory directly under `root`; each object is a file
/// named after its key. Puts write a temporary file in the bucket directory
/// and rename it over the target, so readers never see a partial object and
/// an abandoned put leaves nothing behind.
#[derive(Clone, Debug)]
pub struct FileSystemBackend {
    root: PathBuf,
}

impl FileSystemBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory for `bucket` (and `root`) if missing.
    pub async fn create_bucket(&self, bucket: &str) -> BackendResult<()> {
        let dir = self.bucket_dir(bucket)?;
        fs::create_dir_all(dir).await?;
        Ok(())
    }

    fn bucket_dir(&self, bucket: &str) -> BackendResult<PathBuf> {
        check_component(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &StorageKey) -> BackendResult<PathBuf> {
        check_component(key.as_str())?;
        Ok(self.bucket_dir(bucket)?.join(key.as_str()))
    }
}

/// Bucket names and keys must stay a single path component under `root`.
fn check_component(name: &str) -> BackendResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(BackendError::InvalidKey(name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl ObjectBackend for FileSystemBackend {
    async fn bucket_exists(&self, bucket: &str) -> BackendResult<bool> {
        let dir = self.bucket_dir(bucket)?;
        match fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                Err(BackendError::PermissionDenied(dir.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, bucket: &str, key: &StorageKey) -> BackendResult<Option<ObjectBody>> {
        let path = self.object_path(bucket, key)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(BackendError::PermissionDenied(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await.ok().map(|meta| meta.len());
        Ok(Some(ObjectBody::new(file, len)))
    }

    async fn put(&self, bucket: &str, key: &StorageKey, data: Bytes) -> BackendResult<()> {
        let path = self.object_path(bucket, key)?;
        let dir = self.bucket_dir(bucket)?;

        // Runs to completion even if the caller drops this future; the temp
        // file is removed on drop unless it was persisted.
        let target = path.clone();
        let result = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| BackendError::Io(std::io::Error::other(e)))?;

        result.map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => BackendError::PermissionDenied(path.display().to_string()),
            _ => e.into(),
        })
    }
}
