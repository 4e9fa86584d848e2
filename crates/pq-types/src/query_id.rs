use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::{encode_query_id, StorageKey};

/// Caller-supplied identifier of one persisted query.
///
/// The content is opaque and untrusted: it may hold characters that are not
/// safe inside an object key. The only guarantee a `QueryId` carries is that
/// it is neither empty nor whitespace-only.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueryId(String);

impl QueryId {
    /// Validate a raw identifier.
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(TypeError::EmptyQueryId);
        }
        if raw.trim().is_empty() {
            return Err(TypeError::BlankQueryId);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The backend object key this id is stored under.
    pub fn storage_key(&self) -> StorageKey {
        encode_query_id(&self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryId({:?})", self.0)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for QueryId {
    type Error = TypeError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl TryFrom<&str> for QueryId {
    type Error = TypeError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<QueryId> for String {
    fn from(id: QueryId) -> Self {
        id.0
    }
}
