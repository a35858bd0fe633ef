//! # Catalog Indexer Repository
//!
//! This crate provides traits and implementations for the two external systems the
//! catalog indexer talks to: the relational catalog that holds the authoritative car
//! data, and the search index the documents are written to. It includes definitions
//! for errors, interfaces, and concrete implementations for PostgreSQL and OpenSearch.

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod postgres;
pub mod types;
pub mod utils;

pub use errors::{CatalogError, SearchIndexError};
pub use interfaces::{CatalogRepository, SearchIndexProvider};
pub use crate::opensearch::OpenSearchProvider;
pub use postgres::PostgresCatalogRepository;
pub use types::{BulkAction, BulkApplySummary, BulkOperationResult};
pub use utils::chunk_ids;
