//! Search index provider trait definition.
//!
//! This module defines the abstract write interface of the search index, allowing for
//! different backend implementations (OpenSearch, Elasticsearch, in-memory mocks).

use async_trait::async_trait;
use catalog_indexer_shared::{IndexDocument, ModelId};

use crate::errors::SearchIndexError;
use crate::types::BulkApplySummary;

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// Only the write side of the index is exposed: the indexer never queries it.
///
/// # Idempotence
///
/// Upserts are full document overwrites and deletes of absent documents succeed, so
/// applying the same batch twice yields the same index state. The indexer relies on this
/// to replay change events after a restart.
///
/// # Index Initialization
///
/// Implementations should call `ensure_index_exists` during application startup to ensure
/// the search index and its alias are properly configured before performing writes.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the search index and its alias exist, creating them if necessary.
    ///
    /// Calling this on an already initialized index is a no-op.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index is ready for use
    /// * `Err(SearchIndexError)` - If initialization fails
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError>;

    /// Drop the current versioned index and create it again with fresh mappings.
    ///
    /// All documents are lost; a full resync is expected afterwards.
    async fn reset_index(&self) -> Result<(), SearchIndexError>;

    /// Apply upserts and deletes in bulk and report the outcome of every item.
    ///
    /// # Arguments
    ///
    /// * `upserts` - Documents to write in full
    /// * `deletes` - IDs of documents to remove; "not found" counts as success
    ///
    /// # Returns
    ///
    /// * `Ok(BulkApplySummary)` - Per-item results; some items may have failed
    /// * `Err(SearchIndexError)` - If the bulk call could not be executed at all, in which
    ///   case no item may be assumed to have been applied
    async fn bulk_apply(
        &self,
        upserts: &[IndexDocument],
        deletes: &[ModelId],
    ) -> Result<BulkApplySummary, SearchIndexError>;
}
