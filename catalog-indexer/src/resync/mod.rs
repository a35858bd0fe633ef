//! Full resync of the search index from the catalog.
//!
//! Walks every model with keyset pagination and rewrites its document. Used after an
//! index reset, or to repair drift without replaying the change stream.

use std::sync::Arc;

use catalog_indexer_repository::CatalogRepository;
use catalog_indexer_shared::ModelId;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::assembler::DocumentAssembler;
use crate::errors::IngestError;
use crate::loader::IndexWriter;

/// Default number of models per resync batch.
pub const DEFAULT_RESYNC_BATCH_SIZE: usize = 100;

/// Totals of a resync run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResyncReport {
    /// Model IDs listed from the catalog.
    pub scanned: usize,
    pub upserted: usize,
    /// Listed IDs that disappeared before they could be fetched.
    pub deleted: usize,
    /// IDs that could not be fetched or written.
    pub failed: usize,
    pub batches: usize,
    pub elapsed_secs: f64,
}

impl ResyncReport {
    pub fn docs_per_sec(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.upserted as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}

/// Rewrites every model document in batches.
pub struct FullResync {
    catalog: Arc<dyn CatalogRepository>,
    assembler: DocumentAssembler,
    writer: IndexWriter,
    batch_size: usize,
}

impl FullResync {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        assembler: DocumentAssembler,
        writer: IndexWriter,
        batch_size: usize,
    ) -> Self {
        Self {
            catalog,
            assembler,
            writer,
            batch_size: batch_size.max(1),
        }
    }

    /// Run the resync to completion.
    ///
    /// Item failures are counted and logged; listing failures abort the run since the
    /// pagination cursor cannot advance past them.
    #[instrument(skip(self), fields(batch_size = self.batch_size))]
    pub async fn run(&self) -> Result<ResyncReport, IngestError> {
        let started = Instant::now();
        let mut report = ResyncReport::default();
        let mut cursor: Option<ModelId> = None;

        info!("Starting full resync");

        loop {
            let ids = self.catalog.list_model_ids(cursor, self.batch_size).await?;
            let Some(last) = ids.last().copied() else {
                break;
            };

            let assembly = self.assembler.assemble(&ids).await;
            let written = self.writer.write(&assembly.found, &assembly.missing).await;

            let failed = written.failed.len() + assembly.failed.len();
            if failed > 0 {
                warn!(
                    batch = report.batches + 1,
                    failed = failed,
                    "Some documents failed during resync"
                );
            }

            report.scanned += ids.len();
            report.upserted += written.upserted;
            report.deleted += written.deleted;
            report.failed += failed;
            report.batches += 1;

            info!(
                batch = report.batches,
                scanned = report.scanned,
                upserted = report.upserted,
                "Resync progress"
            );

            cursor = Some(last);
            if ids.len() < self.batch_size {
                break;
            }
        }

        report.elapsed_secs = started.elapsed().as_secs_f64();
        info!(
            scanned = report.scanned,
            upserted = report.upserted,
            deleted = report.deleted,
            failed = report.failed,
            elapsed_secs = format!("{:.2}", report.elapsed_secs),
            docs_per_sec = format!("{:.2}", report.docs_per_sec()),
            "Full resync completed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockCatalog, MockSearchIndex};

    fn resync(
        catalog: Arc<MockCatalog>,
        index: Arc<MockSearchIndex>,
        batch_size: usize,
    ) -> FullResync {
        FullResync::new(
            catalog.clone(),
            DocumentAssembler::new(catalog, 500),
            IndexWriter::new(index),
            batch_size,
        )
    }

    #[tokio::test]
    async fn test_resync_writes_every_model() {
        let catalog = Arc::new(MockCatalog::fixture());
        let index = Arc::new(MockSearchIndex::new());

        let report = resync(catalog, index.clone(), 2).run().await.unwrap();

        assert_eq!(report.scanned, 5);
        assert_eq!(report.upserted, 5);
        assert_eq!(report.failed, 0);
        assert_eq!(report.batches, 3);
        assert_eq!(index.document_ids(), vec![100, 101, 102, 200, 201]);
    }

    #[tokio::test]
    async fn test_resync_counts_failures() {
        let catalog = Arc::new(MockCatalog::fixture());
        let index = Arc::new(MockSearchIndex::new());
        index.reject_ids(&[102]);

        let report = resync(catalog, index.clone(), 100).run().await.unwrap();

        assert_eq!(report.upserted, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.batches, 1);
    }

    #[tokio::test]
    async fn test_resync_empty_catalog() {
        let catalog = Arc::new(MockCatalog::new());
        let index = Arc::new(MockSearchIndex::new());

        let report = resync(catalog, index.clone(), 100).run().await.unwrap();

        assert_eq!(report.scanned, 0);
        assert!(index.request_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_aborts() {
        let catalog = Arc::new(MockCatalog::fixture());
        catalog.fail_fetch(true);
        let index = Arc::new(MockSearchIndex::new());

        let result = resync(catalog, index, 100).run().await;
        assert!(matches!(result, Err(IngestError::StorageError(_))));
    }
}
