//! Document assembler.
//!
//! Fetches the authoritative state of canonical IDs from the catalog and sorts them into
//! documents to upsert and IDs to delete. An ID the catalog no longer has is a delete,
//! whatever operation the change stream reported for it.

use std::collections::BTreeSet;
use std::sync::Arc;

use catalog_indexer_repository::{CatalogRepository, chunk_ids};
use catalog_indexer_shared::{IndexDocument, ModelId};
use tracing::{debug, error, instrument};

/// Outcome of assembling a batch of canonical IDs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    /// Documents for IDs present in the catalog.
    pub found: Vec<IndexDocument>,
    /// IDs absent from the catalog.
    pub missing: Vec<ModelId>,
    /// IDs whose fetch failed; their state is unknown.
    pub failed: Vec<ModelId>,
}

/// Builds index documents from the catalog, one query per chunk of IDs.
pub struct DocumentAssembler {
    catalog: Arc<dyn CatalogRepository>,
    chunk_size: usize,
}

impl DocumentAssembler {
    pub fn new(catalog: Arc<dyn CatalogRepository>, chunk_size: usize) -> Self {
        Self {
            catalog,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Assemble documents for `ids`.
    #[instrument(skip(self, ids), fields(id_count = ids.len()))]
    pub async fn assemble(&self, ids: &[ModelId]) -> Assembly {
        let mut assembly = Assembly::default();

        for chunk in chunk_ids(ids, self.chunk_size) {
            match self.catalog.fetch_documents(&chunk).await {
                Ok(documents) => {
                    let requested: BTreeSet<ModelId> = chunk.iter().copied().collect();
                    let found: BTreeSet<ModelId> = documents.iter().map(|d| d.id).collect();

                    assembly
                        .missing
                        .extend(requested.difference(&found).copied());
                    assembly
                        .found
                        .extend(documents.into_iter().filter(|d| requested.contains(&d.id)));
                }
                Err(e) => {
                    error!(
                        chunk_len = chunk.len(),
                        error = %e,
                        "Failed to fetch documents, IDs will be retried"
                    );
                    assembly.failed.extend(chunk);
                }
            }
        }

        debug!(
            found = assembly.found.len(),
            missing = assembly.missing.len(),
            failed = assembly.failed.len(),
            "Assembled documents"
        );
        assembly
    }
}
