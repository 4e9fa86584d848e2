//! [`ObjectQueryStorage`]: persisted queries on top of an [`ObjectBackend`].

use async_trait::async_trait;
use bytes::Bytes;
use pq_types::QueryId;
use tracing::{debug, info, warn};

use crate::backend::ObjectBackend;
use crate::document::{Query, QueryDocument};
use crate::error::{BackendError, Operation, QueryStoreError, QueryStoreResult};
use crate::traits::{ReadStoredQueries, WriteStoredQueries};

/// Persisted query store backed by one bucket of an object store.
///
/// Holds no cache and no mutable state: every read issues exactly one
/// backend `get` and every write exactly one `put`, so any number of calls
/// may run concurrently. Visibility of a write to later reads is whatever
/// the backend's consistency model provides.
#[derive(Debug)]
pub struct ObjectQueryStorage<B> {
    backend: B,
    bucket: String,
}

impl<B: ObjectBackend> ObjectQueryStorage<B> {
    /// Create a store over `bucket`, failing fast if the bucket does not
    /// exist or cannot be checked.
    pub async fn connect(backend: B, bucket: impl Into<String>) -> QueryStoreResult<Self> {
        let bucket = bucket.into();
        if bucket.trim().is_empty() {
            return Err(QueryStoreError::InvalidArgument {
                name: "bucket",
                reason: "bucket name must not be blank".into(),
            });
        }

        match backend.bucket_exists(&bucket).await {
            Ok(true) => {
                info!(bucket = %bucket, "persisted query bucket validated");
                Ok(Self { backend, bucket })
            }
            Ok(false) => Err(QueryStoreError::BucketNotFound { bucket }),
            Err(source) => Err(QueryStoreError::BucketUnreachable { bucket, source }),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

fn validate_query_id(raw: &str) -> QueryStoreResult<QueryId> {
    QueryId::new(raw).map_err(|e| QueryStoreError::InvalidArgument {
        name: "query_id",
        reason: e.to_string(),
    })
}

fn storage_error(operation: Operation, query_id: &QueryId, source: BackendError) -> QueryStoreError {
    QueryStoreError::Storage {
        operation,
        query_id: query_id.to_string(),
        source,
    }
}

#[async_trait]
impl<B: ObjectBackend> ReadStoredQueries for ObjectQueryStorage<B> {
    async fn read_query(&self, query_id: &str) -> QueryStoreResult<Option<QueryDocument>> {
        let query_id = validate_query_id(query_id)?;
        let key = query_id.storage_key();
        debug!(query_id = %query_id, key = %key, bucket = %self.bucket, "reading persisted query");

        let body = match self
            .backend
            .get(&self.bucket, &key)
            .await
            .map_err(|e| storage_error(Operation::Read, &query_id, e))?
        {
            Some(body) => body,
            None => {
                debug!(query_id = %query_id, "persisted query not found");
                return Ok(None);
            }
        };

        let mut buffer = Vec::new();
        body.read_into(&mut buffer)
            .await
            .map_err(|e| storage_error(Operation::Read, &query_id, BackendError::Io(e)))?;

        match QueryDocument::parse(&buffer) {
            Ok(document) => Ok(Some(document)),
            Err(source) => {
                warn!(query_id = %query_id, key = %key, error = %source, "stored query is malformed");
                Err(QueryStoreError::MalformedDocument {
                    query_id: query_id.into_inner(),
                    source,
                })
            }
        }
    }
}

#[async_trait]
impl<B: ObjectBackend> WriteStoredQueries for ObjectQueryStorage<B> {
    async fn write_query(&self, query_id: &str, query: &dyn Query) -> QueryStoreResult<()> {
        let query_id = validate_query_id(query_id)?;

        // The backend needs a length-known payload, so serialize in full first.
        let mut buffer = Vec::new();
        query
            .write_to(&mut buffer)
            .map_err(|e| QueryStoreError::InvalidArgument {
                name: "query",
                reason: format!("query could not be serialized: {e}"),
            })?;
        if buffer.is_empty() {
            return Err(QueryStoreError::InvalidArgument {
                name: "query",
                reason: "query serialized to zero bytes".into(),
            });
        }

        let key = query_id.storage_key();
        debug!(
            query_id = %query_id,
            key = %key,
            bucket = %self.bucket,
            bytes = buffer.len(),
            "writing persisted query"
        );
        self.backend
            .put(&self.bucket, &key, Bytes::from(buffer))
            .await
            .map_err(|e| storage_error(Operation::Write, &query_id, e))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use pq_types::StorageKey;

    use super::*;
    use crate::backend::ObjectBody;
    use crate::document::QuerySourceText;
    use crate::error::BackendResult;
    use crate::memory::InMemoryBackend;
    use crate::traits::{ReadStoredQueriesExt, WriteStoredQueriesExt};

    const BUCKET: &str = "queries";

    /// Counts backend calls on top of an in-memory backend.
    #[derive(Default)]
    struct CountingBackend {
        inner: InMemoryBackend,
        gets: AtomicUsize,
        puts: AtomicUsize,
    }

    #[async_trait]
    impl ObjectBackend for CountingBackend {
        async fn bucket_exists(&self, bucket: &str) -> BackendResult<bool> {
            self.inner.bucket_exists(bucket).await
        }

        async fn get(&self, bucket: &str, key: &StorageKey) -> BackendResult<Option<ObjectBody>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(bucket, key).await
        }

        async fn put(&self, bucket: &str, key: &StorageKey, data: Bytes) -> BackendResult<()> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(bucket, key, data).await
        }
    }

    /// Fails every object operation.
    struct FailingBackend;

    #[async_trait]
    impl ObjectBackend for FailingBackend {
        async fn bucket_exists(&self, _bucket: &str) -> BackendResult<bool> {
            Ok(true)
        }

        async fn get(&self, _bucket: &str, _key: &StorageKey) -> BackendResult<Option<ObjectBody>> {
            Err(BackendError::Unavailable("connection reset".into()))
        }

        async fn put(&self, _bucket: &str, _key: &StorageKey, _data: Bytes) -> BackendResult<()> {
            Err(BackendError::PermissionDenied("write not allowed".into()))
        }
    }

    /// Never completes a get or put.
    struct StalledBackend;

    #[async_trait]
    impl ObjectBackend for StalledBackend {
        async fn bucket_exists(&self, _bucket: &str) -> BackendResult<bool> {
            Ok(true)
        }

        async fn get(&self, _bucket: &str, _key: &StorageKey) -> BackendResult<Option<ObjectBody>> {
            std::future::pending().await
        }

        async fn put(&self, _bucket: &str, _key: &StorageKey, _data: Bytes) -> BackendResult<()> {
            std::future::pending().await
        }
    }

    async fn store() -> ObjectQueryStorage<InMemoryBackend> {
        ObjectQueryStorage::connect(InMemoryBackend::with_bucket(BUCKET), BUCKET)
            .await
            .unwrap()
    }

    async fn counting_store() -> ObjectQueryStorage<Arc<CountingBackend>> {
        let backend = Arc::new(CountingBackend::default());
        backend.inner.create_bucket(BUCKET);
        ObjectQueryStorage::connect(backend, BUCKET).await.unwrap()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn connect_requires_existing_bucket() {
        let err = ObjectQueryStorage::connect(InMemoryBackend::new(), "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryStoreError::BucketNotFound { ref bucket } if bucket == "missing"));
        assert!(!err.is_storage());
    }

    #[tokio::test]
    async fn connect_rejects_blank_bucket() {
        let err = ObjectQueryStorage::connect(InMemoryBackend::new(), "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryStoreError::InvalidArgument { name: "bucket", .. }));
    }

    #[tokio::test]
    async fn connect_does_not_touch_objects() {
        let backend = Arc::new(CountingBackend::default());
        let _ = ObjectQueryStorage::connect(backend.clone(), BUCKET).await;
        assert_eq!(backend.gets.load(Ordering::SeqCst), 0);
        assert_eq!(backend.puts.load(Ordering::SeqCst), 0);
    }

    // -----------------------------------------------------------------------
    // Read / write
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let store = store().await;
        let doc = QueryDocument::parse_str("query GetUser { user { id name } }").unwrap();
        store.write_query("abc/def+g==", &doc).await.unwrap();

        let read = store.read_query("abc/def+g==").await.unwrap().expect("should exist");
        assert_eq!(read, doc);
        assert_eq!(read.operation_names(), vec![Some("GetUser".to_string())]);
    }

    #[tokio::test]
    async fn write_uses_encoded_key() {
        let store = store().await;
        store
            .write_query("a/b+c=tail", &QuerySourceText::from("{ a }"))
            .await
            .unwrap();
        let raw = store.backend().object(BUCKET, "a-b_c.graphql").expect("raw object");
        assert_eq!(&raw[..], b"{ a }");
    }

    #[tokio::test]
    async fn missing_query_is_none() {
        let store = store().await;
        assert!(store.read_query("never-written").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let store = store().await;
        store.write_query("q", &QuerySourceText::from("{ first }")).await.unwrap();
        store.write_query("q", &QuerySourceText::from("{ second }")).await.unwrap();

        let read = store.read_query("q").await.unwrap().unwrap();
        assert_eq!(read.source(), "{ second }");
    }

    #[tokio::test]
    async fn ids_sharing_a_prefix_before_padding_share_a_key() {
        let store = store().await;
        store.write_query("abc=1", &QuerySourceText::from("{ one }")).await.unwrap();
        let read = store.read_query("abc=2").await.unwrap().unwrap();
        assert_eq!(read.source(), "{ one }");
    }

    #[tokio::test]
    async fn malformed_bytes_are_reported() {
        let store = store().await;
        store.backend().insert_raw(BUCKET, "broken.graphql", &b"query {"[..]);
        let err = store.read_query("broken").await.unwrap_err();
        assert!(matches!(err, QueryStoreError::MalformedDocument { ref query_id, .. } if query_id == "broken"));
    }

    #[tokio::test]
    async fn non_utf8_bytes_are_malformed() {
        let store = store().await;
        store.backend().insert_raw(BUCKET, "bin.graphql", vec![0xff, 0x00, 0xfe]);
        let err = store.read_query("bin").await.unwrap_err();
        assert!(matches!(err, QueryStoreError::MalformedDocument { .. }));
    }

    #[tokio::test]
    async fn empty_object_is_malformed() {
        let store = store().await;
        store.backend().insert_raw(BUCKET, "empty.graphql", Vec::new());
        let err = store.read_query("empty").await.unwrap_err();
        assert!(matches!(err, QueryStoreError::MalformedDocument { .. }));
    }

    // -----------------------------------------------------------------------
    // Argument validation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn blank_ids_are_rejected_without_backend_calls() {
        let store = counting_store().await;
        for id in ["", " ", "\t\n"] {
            let err = store.read_query(id).await.unwrap_err();
            assert!(matches!(err, QueryStoreError::InvalidArgument { name: "query_id", .. }));
            let err = store
                .write_query(id, &QuerySourceText::from("{ a }"))
                .await
                .unwrap_err();
            assert!(matches!(err, QueryStoreError::InvalidArgument { name: "query_id", .. }));
        }
        assert_eq!(store.backend().gets.load(Ordering::SeqCst), 0);
        assert_eq!(store.backend().puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let store = counting_store().await;
        let err = store
            .write_query("q", &QuerySourceText::from(""))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryStoreError::InvalidArgument { name: "query", .. }));
        assert_eq!(store.backend().puts.load(Ordering::SeqCst), 0);
    }

    // -----------------------------------------------------------------------
    // Backend contract
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn one_backend_call_per_operation() {
        let store = counting_store().await;
        store.write_query("q", &QuerySourceText::from("{ a }")).await.unwrap();
        assert_eq!(store.backend().puts.load(Ordering::SeqCst), 1);
        assert_eq!(store.backend().gets.load(Ordering::SeqCst), 0);

        store.read_query("q").await.unwrap().unwrap();
        store.read_query("missing").await.unwrap();
        assert_eq!(store.backend().gets.load(Ordering::SeqCst), 2);
        assert_eq!(store.backend().puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backend_failures_carry_operation_and_id() {
        let store = ObjectQueryStorage::connect(FailingBackend, BUCKET).await.unwrap();

        let err = store.read_query("q1").await.unwrap_err();
        assert!(err.is_storage());
        match err {
            QueryStoreError::Storage { operation, query_id, source } => {
                assert_eq!(operation, Operation::Read);
                assert_eq!(query_id, "q1");
                assert!(matches!(source, BackendError::Unavailable(_)));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = store
            .write_query("q2", &QuerySourceText::from("{ a }"))
            .await
            .unwrap_err();
        match err {
            QueryStoreError::Storage { operation, query_id, source } => {
                assert_eq!(operation, Operation::Write);
                assert_eq!(query_id, "q2");
                assert!(matches!(source, BackendError::PermissionDenied(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn concurrent_reads_and_writes() {
        let store = Arc::new(store().await);
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("q{i}");
                let text = format!("query Q{i} {{ field{i} }}");
                store.write_query(&id, &QuerySourceText(text.clone())).await.unwrap();
                let read = store.read_query(&id).await.unwrap().unwrap();
                assert_eq!(read.source(), text);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.backend().len(BUCKET), 16);
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn cancelled_read() {
        let store = ObjectQueryStorage::connect(StalledBackend, BUCKET).await.unwrap();
        let err = store
            .read_query_or_cancel("q", std::future::ready(()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QueryStoreError::Cancelled { operation: Operation::Read, ref query_id } if query_id == "q"
        ));
    }

    #[tokio::test]
    async fn cancelled_write() {
        let store = ObjectQueryStorage::connect(StalledBackend, BUCKET).await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let cancel = async move {
            let _ = rx.await;
        };
        tx.send(()).unwrap();
        let err = store
            .write_query_or_cancel("q", &QuerySourceText::from("{ a }"), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryStoreError::Cancelled { operation: Operation::Write, .. }));
    }

    #[tokio::test]
    async fn uncancelled_read_completes() {
        let store = store().await;
        store.write_query("q", &QuerySourceText::from("{ a }")).await.unwrap();
        let read = store
            .read_query_or_cancel("q", std::future::pending())
            .await
            .unwrap();
        assert!(read.is_some());
    }
}
