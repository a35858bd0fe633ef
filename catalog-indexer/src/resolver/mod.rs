//! Entity resolver.
//!
//! Turns raw change events into the canonical model IDs they affect. Model events map to
//! themselves, series and brand events fan out to every model beneath them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use catalog_indexer_repository::{CatalogRepository, chunk_ids};
use catalog_indexer_shared::{ChangeEvent, ModelId, SourceTable};
use tracing::{debug, error, instrument};

use crate::metrics::SyncMetrics;

/// Outcome of resolving a batch of change events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Canonical model IDs affected by the batch.
    pub ids: BTreeSet<ModelId>,
    /// Events naming a table outside the catalog.
    pub unknown: Vec<ChangeEvent>,
    /// Events whose fan-out query failed; they must be resolved again later.
    pub unresolved: Vec<ChangeEvent>,
}

/// Resolves change events against the catalog.
pub struct EntityResolver {
    catalog: Arc<dyn CatalogRepository>,
    chunk_size: usize,
    metrics: Arc<SyncMetrics>,
}

impl EntityResolver {
    /// Create a resolver issuing at most `chunk_size` parent IDs per fan-out query.
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        chunk_size: usize,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        Self {
            catalog,
            chunk_size: chunk_size.max(1),
            metrics,
        }
    }

    /// Resolve a batch of events.
    ///
    /// Never fails as a whole: unknown tables and failing fan-out chunks are reported in
    /// the [`Resolution`] so the caller can decide what to do with them.
    #[instrument(skip(self, events), fields(event_count = events.len()))]
    pub async fn resolve(&self, events: &[ChangeEvent]) -> Resolution {
        let mut resolution = Resolution::default();
        let mut parents: BTreeMap<SourceTable, BTreeMap<i64, ChangeEvent>> = BTreeMap::new();

        for event in events {
            match event.table() {
                Ok(SourceTable::Model) => {
                    resolution.ids.insert(event.row_id);
                }
                Ok(table) => {
                    parents
                        .entry(table)
                        .or_default()
                        .entry(event.row_id)
                        .or_insert_with(|| event.clone());
                }
                Err(e) => {
                    error!(
                        table = %event.source_table,
                        row_id = event.row_id,
                        error = %e,
                        "Change event from an unknown table, not indexed"
                    );
                    resolution.unknown.push(event.clone());
                }
            }
        }

        SyncMetrics::add(&self.metrics.unknown_table_events, resolution.unknown.len());

        for (table, rows) in parents {
            let parent_ids: Vec<i64> = rows.keys().copied().collect();
            for chunk in chunk_ids(&parent_ids, self.chunk_size) {
                match self.catalog.resolve_parent(table, &chunk).await {
                    Ok(model_ids) => {
                        debug!(
                            table = %table,
                            parents = chunk.len(),
                            models = model_ids.len(),
                            "Fanned out parent rows"
                        );
                        resolution.ids.extend(model_ids);
                    }
                    Err(e) => {
                        error!(
                            table = %table,
                            parents = chunk.len(),
                            error = %e,
                            "Fan-out query failed, events will be retried"
                        );
                        resolution
                            .unresolved
                            .extend(chunk.iter().filter_map(|id| rows.get(id).cloned()));
                    }
                }
            }
        }

        resolution
    }
}
