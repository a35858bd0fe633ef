use async_trait::async_trait;
use catalog_indexer_shared::{IndexDocument, ModelId, SourceTable};

use crate::errors::CatalogError;

/// Trait for reading the authoritative car catalog.
///
/// This trait provides a clean abstraction over the relational store that owns the
/// brand / series / model hierarchy. Callers are expected to keep the ID lists they pass
/// bounded; the indexer chunks them before calling.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Fetch and flatten the models with the given IDs.
    ///
    /// IDs that no longer exist are simply absent from the result.
    async fn fetch_documents(&self, ids: &[ModelId]) -> Result<Vec<IndexDocument>, CatalogError>;

    /// Resolve parent rows of `table` to the IDs of the models beneath them.
    ///
    /// `Series` resolves through `car_model.series_id`, `Brand` through
    /// `car_series.brand_id` and then `car_model.series_id`. `Model` is not a parent
    /// table and yields `CatalogError::UnsupportedTable`.
    async fn resolve_parent(
        &self,
        table: SourceTable,
        ids: &[i64],
    ) -> Result<Vec<ModelId>, CatalogError>;

    /// List model IDs greater than `after` in ascending order, at most `limit` of them.
    ///
    /// Used for keyset pagination by the full resync job.
    async fn list_model_ids(
        &self,
        after: Option<ModelId>,
        limit: usize,
    ) -> Result<Vec<ModelId>, CatalogError>;
}
