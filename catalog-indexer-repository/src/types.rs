//! Request and response types for search index operations.

use std::collections::BTreeSet;

use catalog_indexer_shared::ModelId;

use crate::errors::SearchIndexError;

/// The kind of write applied to one document in a bulk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    /// Full overwrite of the document (create or replace).
    Index,
    /// Removal of the document.
    Delete,
}

/// Result of a bulk operation for a single document.
///
/// A delete of a document that is already absent is reported as a success: the
/// desired end state is reached.
#[derive(Debug, Clone)]
pub struct BulkOperationResult {
    /// The canonical model ID.
    pub id: ModelId,
    /// The action that was applied.
    pub action: BulkAction,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

impl BulkOperationResult {
    /// A successful result.
    pub fn ok(id: ModelId, action: BulkAction) -> Self {
        Self {
            id,
            action,
            success: true,
            error: None,
        }
    }

    /// A failed result.
    pub fn failed(id: ModelId, action: BulkAction, error: SearchIndexError) -> Self {
        Self {
            id,
            action,
            success: false,
            error: Some(error),
        }
    }
}

/// Summary of a bulk apply containing aggregate statistics and individual results.
///
/// This allows callers to handle partial failures: only the failed IDs need to be
/// retried.
#[derive(Debug, Clone, Default)]
pub struct BulkApplySummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BulkOperationResult>,
}

impl BulkApplySummary {
    /// Build a summary from individual results.
    pub fn from_results(results: Vec<BulkOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// IDs of every item that failed.
    pub fn failed_ids(&self) -> BTreeSet<ModelId> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.id)
            .collect()
    }

    /// Number of successful operations of the given kind.
    pub fn succeeded_for(&self, action: BulkAction) -> usize {
        self.results
            .iter()
            .filter(|r| r.success && r.action == action)
            .count()
    }
}
