use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The store operation a failure is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Failures reported by an object-storage backend.
///
/// Backends classify their client's errors into these variants; the query
/// store passes them through without reinterpretation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached (network, DNS, throttling).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Credentials were rejected or lack the required permission.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The key cannot be represented in this backend's namespace.
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    /// I/O failure while transferring object bytes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error surfaced by the storage client.
    #[error("storage service error: {0}")]
    Service(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Stored bytes that are not a valid GraphQL query document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("syntax error: {0}")]
    Syntax(#[from] async_graphql_parser::Error),
}

/// Errors from query store operations.
///
/// A lookup that finds nothing is not an error: reads return `Ok(None)`.
#[derive(Debug, Error)]
pub enum QueryStoreError {
    /// The caller passed an unusable argument. Never retryable.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// The stored bytes do not parse as a query document.
    #[error("stored query {query_id} is malformed: {source}")]
    MalformedDocument {
        query_id: String,
        #[source]
        source: DocumentError,
    },

    /// The backend failed while serving a read or write.
    #[error("storage {operation} failed for query {query_id}: {source}")]
    Storage {
        operation: Operation,
        query_id: String,
        #[source]
        source: BackendError,
    },

    /// The configured bucket does not exist.
    #[error("bucket not found: {bucket}")]
    BucketNotFound { bucket: String },

    /// The configured bucket could not be checked.
    #[error("bucket {bucket} is unreachable: {source}")]
    BucketUnreachable {
        bucket: String,
        #[source]
        source: BackendError,
    },

    /// The caller's cancellation signal fired before the operation completed.
    #[error("{operation} of query {query_id} was cancelled")]
    Cancelled {
        operation: Operation,
        query_id: String,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl QueryStoreError {
    /// Whether the error stems from the backend failing rather than the
    /// caller, the stored data or the configuration. A missing bucket is a
    /// configuration problem and is not included.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::BucketUnreachable { .. })
    }
}

/// Result alias for query store operations.
pub type QueryStoreResult<T> = Result<T, QueryStoreError>;

/// Errors loading or validating a [`StorageConfig`](crate::config::StorageConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("backend `{0}` is not compiled into this build")]
    UnsupportedBackend(&'static str),
}
