//! Error types for the catalog indexer pipeline.

use catalog_indexer_repository::{CatalogError, SearchIndexError};
use thiserror::Error;

/// Errors that can occur in the catalog indexer pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The search index could not be reached or refused a request.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// Consumer creation, subscription, pause/resume or commit failed.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// A change record could not be decoded.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A catalog query failed.
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl IngestError {
    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }

    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for IngestError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}

impl From<CatalogError> for IngestError {
    fn from(err: CatalogError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<SearchIndexError> for IngestError {
    fn from(err: SearchIndexError) -> Self {
        Self::LoaderError(err.to_string())
    }
}
