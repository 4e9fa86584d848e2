//! Read and write capabilities over a persisted query store.
//!
//! A query-executing process only needs [`ReadStoredQueries`]; the
//! registration path additionally needs [`WriteStoredQueries`]. Handing out
//! one or the other restricts what a consumer can do with the same store.

use std::future::Future;

use async_trait::async_trait;

use crate::document::{Query, QueryDocument};
use crate::error::{Operation, QueryStoreError, QueryStoreResult};

/// Lookup of persisted queries by query id.
#[async_trait]
pub trait ReadStoredQueries: Send + Sync {
    /// Fetch and parse the query stored under `query_id`.
    ///
    /// Returns `Ok(None)` if no query is stored under that id.
    /// Returns `Err` for a blank id, a backend failure, or stored bytes that
    /// fail to parse.
    async fn read_query(&self, query_id: &str) -> QueryStoreResult<Option<QueryDocument>>;
}

/// Registration of persisted queries.
#[async_trait]
pub trait WriteStoredQueries: ReadStoredQueries {
    /// Store `query` under `query_id`, replacing any previous content.
    async fn write_query(&self, query_id: &str, query: &dyn Query) -> QueryStoreResult<()>;
}

/// Cooperative cancellation for [`ReadStoredQueries`].
///
/// Dropping a read future already aborts it; this adds an explicit signal
/// that can be shared with other work.
#[async_trait]
pub trait ReadStoredQueriesExt: ReadStoredQueries {
    /// Like [`read_query`](ReadStoredQueries::read_query), but resolves to
    /// [`QueryStoreError::Cancelled`] as soon as `cancel` completes.
    async fn read_query_or_cancel<C>(
        &self,
        query_id: &str,
        cancel: C,
    ) -> QueryStoreResult<Option<QueryDocument>>
    where
        C: Future<Output = ()> + Send;
}

#[async_trait]
impl<T: ReadStoredQueries + ?Sized> ReadStoredQueriesExt for T {
    async fn read_query_or_cancel<C>(
        &self,
        query_id: &str,
        cancel: C,
    ) -> QueryStoreResult<Option<QueryDocument>>
    where
        C: Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.read_query(query_id) => result,
            () = cancel => Err(QueryStoreError::Cancelled {
                operation: Operation::Read,
                query_id: query_id.to_string(),
            }),
        }
    }
}

/// Cooperative cancellation for [`WriteStoredQueries`].
///
/// An aborted write leaves either the previous object or the new one in the
/// backend, never a partial object.
#[async_trait]
pub trait WriteStoredQueriesExt: WriteStoredQueries {
    async fn write_query_or_cancel<C>(
        &self,
        query_id: &str,
        query: &dyn Query,
        cancel: C,
    ) -> QueryStoreResult<()>
    where
        C: Future<Output = ()> + Send;
}

#[async_trait]
impl<T: WriteStoredQueries + ?Sized> WriteStoredQueriesExt for T {
    async fn write_query_or_cancel<C>(
        &self,
        query_id: &str,
        query: &dyn Query,
        cancel: C,
    ) -> QueryStoreResult<()>
    where
        C: Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.write_query(query_id, query) => result,
            () = cancel => Err(QueryStoreError::Cancelled {
                operation: Operation::Write,
                query_id: query_id.to_string(),
            }),
        }
    }
}
