use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("query id must not be empty")]
    EmptyQueryId,

    #[error("query id must not consist only of whitespace")]
    BlankQueryId,
}
