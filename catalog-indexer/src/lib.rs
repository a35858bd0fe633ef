//! # Catalog Indexer
//!
//! Keeps the car search index in sync with the catalog database by consuming the
//! Debezium change stream from Kafka.
//!
//! ## Architecture
//!
//! 1. **Consumer**: Reads change records from Kafka
//! 2. **Resolver**: Maps changed rows to the model documents they affect
//! 3. **Assembler**: Rebuilds those documents from the catalog
//! 4. **Loader**: Writes documents to OpenSearch
//! 5. **Buffer**: Batches, retries, applies backpressure and commits offsets
//! 6. **Orchestrator**: Runs the intake and flush loops
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`consumer`]: Change source contract and Kafka consumer
//! - [`resolver`]: Fan-out of change events to canonical IDs
//! - [`assembler`]: Document assembly from the catalog
//! - [`loader`]: Bulk writes to the search index
//! - [`buffer`]: SmartBuffer flow controller and dead-letter sink
//! - [`orchestrator`]: Coordinates the sync flow
//! - [`resync`]: Full rebuild of the index
//! - [`metrics`]: Pipeline counters
//! - [`errors`]: Error types for the indexer

pub mod assembler;
pub mod buffer;
pub mod config;
pub mod consumer;
pub mod errors;
pub mod loader;
pub mod metrics;
pub mod orchestrator;
pub mod resolver;
pub mod resync;

#[cfg(test)]
mod test_support;

pub use config::{Dependencies, IndexerSettings};
pub use errors::IngestError;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
