//! Parsed query documents and the serialization contract for writes.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use async_graphql_parser::types::ExecutableDocument;

use crate::error::DocumentError;

/// A parsed, immutable GraphQL query document.
///
/// Keeps the source text it was parsed from so that it can be written back
/// to a store byte-for-byte. Two documents are equal when their source text
/// is equal. Cloning is cheap.
#[derive(Clone)]
pub struct QueryDocument {
    source: Arc<str>,
    document: Arc<ExecutableDocument>,
}

impl QueryDocument {
    /// Parse UTF-8 query bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, DocumentError> {
        let source = std::str::from_utf8(bytes)?;
        Self::parse_str(source)
    }

    /// Parse query source text.
    pub fn parse_str(source: &str) -> Result<Self, DocumentError> {
        let document = async_graphql_parser::parse_query(source)?;
        Ok(Self {
            source: Arc::from(source),
            document: Arc::new(document),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed syntax tree.
    pub fn document(&self) -> &ExecutableDocument {
        &self.document
    }

    /// Names of the operations in the document, sorted; `None` for an
    /// anonymous operation.
    pub fn operation_names(&self) -> Vec<Option<String>> {
        let mut names: Vec<Option<String>> = self
            .document
            .operations
            .iter()
            .map(|(name, _)| name.map(|n| n.to_string()))
            .collect();
        names.sort();
        names
    }

    pub fn fragment_count(&self) -> usize {
        self.document.fragments.len()
    }
}

impl PartialEq for QueryDocument {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for QueryDocument {}

impl fmt::Debug for QueryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDocument")
            .field("source_len", &self.source.len())
            .field("operations", &self.operation_names())
            .finish()
    }
}

impl fmt::Display for QueryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A query that can be serialized for storage.
pub trait Query: Send + Sync {
    /// Write the serialized query to `out`.
    fn write_to(&self, out: &mut dyn Write) -> std::io::Result<()>;
}

impl Query for QueryDocument {
    fn write_to(&self, out: &mut dyn Write) -> std::io::Result<()> {
        out.write_all(self.source.as_bytes())
    }
}

/// Unparsed query text, stored as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySourceText(pub String);

impl Query for QuerySourceText {
    fn write_to(&self, out: &mut dyn Write) -> std::io::Result<()> {
        out.write_all(self.0.as_bytes())
    }
}

impl From<String> for QuerySourceText {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for QuerySourceText {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}
