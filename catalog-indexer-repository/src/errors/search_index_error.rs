//! Search index error types.
//!
//! One enum serves both as the error of a whole provider call and as the reason
//! attached to a single rejected item of a bulk response.

use thiserror::Error;

/// Errors from search index operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// The cluster could not be reached or the client could not be built.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// An `index` action was rejected for one document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// A `delete` action was rejected for one document.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// The `_bulk` call itself failed; every item in it is unaccounted for.
    #[error("Bulk request error: {0}")]
    BulkRequestError(String),

    /// Creating or dropping the versioned index, or pointing the alias at it, failed.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchIndexError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    pub fn bulk_request(msg: impl Into<String>) -> Self {
        Self::BulkRequestError(msg.into())
    }

    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}
