//! Loader module for the catalog indexer.
//!
//! Applies assembled documents and deletes to the search index in bulk and reports which
//! IDs failed, so the buffer can retry exactly those.

use std::collections::BTreeSet;
use std::sync::Arc;

use catalog_indexer_repository::{BulkAction, SearchIndexProvider};
use catalog_indexer_shared::{IndexDocument, ModelId};
use tracing::{debug, error, instrument, warn};

use crate::errors::IngestError;

/// Configuration for the index writer.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Maximum number of operations per bulk request.
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { batch_size: 1000 }
    }
}

/// Outcome of writing one flush worth of documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Documents successfully indexed.
    pub upserted: usize,
    /// Documents successfully deleted (including already absent ones).
    pub deleted: usize,
    /// IDs whose upsert or delete failed.
    pub failed: BTreeSet<ModelId>,
}

/// Writes documents into the search index.
pub struct IndexWriter {
    provider: Arc<dyn SearchIndexProvider>,
    config: LoaderConfig,
}

impl IndexWriter {
    /// Create a new index writer with the given provider.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self::with_config(provider, LoaderConfig::default())
    }

    /// Create a new index writer with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: LoaderConfig) -> Self {
        Self {
            provider,
            config: LoaderConfig {
                batch_size: config.batch_size.max(1),
            },
        }
    }

    /// Check that the index is ready to receive writes.
    pub async fn check_ready(&self) -> Result<(), IngestError> {
        self.provider
            .ensure_index_exists()
            .await
            .map_err(|e| IngestError::loader(format!("Search index not ready: {}", e)))
    }

    /// Upsert `documents` and delete `deletes`.
    ///
    /// Operations are sent in bulk requests of at most `batch_size` items. A request that
    /// cannot be executed at all fails every ID it carried; other requests are unaffected.
    #[instrument(skip(self, documents, deletes), fields(upserts = documents.len(), deletes = deletes.len()))]
    pub async fn write(&self, documents: &[IndexDocument], deletes: &[ModelId]) -> WriteOutcome {
        let mut outcome = WriteOutcome::default();
        let mut upserts = documents;
        let mut deletes = deletes;

        while !upserts.is_empty() || !deletes.is_empty() {
            let upsert_count = upserts.len().min(self.config.batch_size);
            let (upsert_batch, upsert_rest) = upserts.split_at(upsert_count);
            let delete_count = deletes.len().min(self.config.batch_size - upsert_count);
            let (delete_batch, delete_rest) = deletes.split_at(delete_count);

            self.apply_batch(upsert_batch, delete_batch, &mut outcome).await;

            upserts = upsert_rest;
            deletes = delete_rest;
        }

        outcome
    }

    async fn apply_batch(
        &self,
        upserts: &[IndexDocument],
        deletes: &[ModelId],
        outcome: &mut WriteOutcome,
    ) {
        match self.provider.bulk_apply(upserts, deletes).await {
            Ok(summary) => {
                for result in summary.results.iter().filter(|r| !r.success) {
                    warn!(
                        id = result.id,
                        action = ?result.action,
                        error = ?result.error,
                        "Bulk item failed"
                    );
                }

                outcome.upserted += summary.succeeded_for(BulkAction::Index);
                outcome.deleted += summary.succeeded_for(BulkAction::Delete);
                outcome.failed.extend(summary.failed_ids());

                debug!(
                    total = summary.total,
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    "Bulk request applied"
                );
            }
            Err(e) => {
                error!(
                    upserts = upserts.len(),
                    deletes = deletes.len(),
                    error = %e,
                    "Bulk request failed, failing every ID in the batch"
                );
                outcome.failed.extend(upserts.iter().map(|d| d.id));
                outcome.failed.extend(deletes.iter().copied());
            }
        }
    }
}
