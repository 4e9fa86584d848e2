//! Persisted GraphQL query storage on object-storage backends.
//!
//! A GraphQL server that supports persisted queries looks documents up by a
//! stable query id instead of receiving the full query text. This crate
//! stores those documents as objects in a bucket, one object per id, keyed
//! by [`encode_query_id`](pq_types::encode_query_id).
//!
//! # Capabilities
//!
//! - [`ReadStoredQueries`] -- lookup, for query-executing processes
//! - [`WriteStoredQueries`] -- lookup and registration, for admin paths
//!
//! Both are implemented by [`ObjectQueryStorage`]; [`QueryStorage`] hands out
//! either handle from one shared instance.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectBackend`] trait:
//!
//! - [`InMemoryBackend`] -- `HashMap`-based, for tests and embedding
//! - [`FileSystemBackend`] -- one directory per bucket
//! - `S3Backend` -- Amazon S3 and compatible services (feature `s3`)
//!
//! # Design Rules
//!
//! 1. The backend is the only source of truth; nothing is cached in-process.
//! 2. One backend `get` per read, one `put` per write, no retries.
//! 3. A missing query is `Ok(None)`, never an error.
//! 4. Stored bytes that fail to parse are an error, never a miss.
//! 5. A missing bucket fails construction, not the first request.

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod fs;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;
pub mod storage;
pub mod traits;
pub mod wiring;

// Re-export primary types at crate root for ergonomic imports.
pub use backend::{ObjectBackend, ObjectBody};
pub use config::{AccessMode, BackendConfig, StorageConfig, DEFAULT_BUCKET};
pub use document::{Query, QueryDocument, QuerySourceText};
pub use error::{
    BackendError, BackendResult, ConfigError, DocumentError, Operation, QueryStoreError,
    QueryStoreResult,
};
pub use fs::FileSystemBackend;
pub use memory::InMemoryBackend;
#[cfg(feature = "s3")]
pub use s3::S3Backend;
pub use storage::ObjectQueryStorage;
pub use traits::{ReadStoredQueries, ReadStoredQueriesExt, WriteStoredQueries, WriteStoredQueriesExt};
pub use wiring::{open_backend, open_storage, DynBackend, QueryStorage};
