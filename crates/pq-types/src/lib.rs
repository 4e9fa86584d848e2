//! Foundation types for persisted query storage.
//!
//! A persisted query is a GraphQL document registered once under a stable
//! identifier and referenced thereafter by that identifier instead of the
//! full query text. This crate holds the two identifier types every other
//! crate in the workspace speaks in.
//!
//! # Key Types
//!
//! - [`QueryId`] — Validated, caller-supplied identifier (typically a content hash)
//! - [`StorageKey`] — Backend-safe object key derived from a query id
//!
//! The mapping from query id to storage key is [`encode_query_id`]. It is
//! one-directional: keys are only ever looked up, never decoded.

pub mod error;
pub mod key;
pub mod query_id;

pub use error::TypeError;
pub use key::{encode_query_id, StorageKey, STORAGE_KEY_SUFFIX};
pub use query_id::QueryId;
