//! Error types for the catalog indexer repository.
//!
//! One error type per external system: the search index and the catalog database.

mod catalog_error;
mod search_index_error;

pub use catalog_error::CatalogError;
pub use search_index_error::SearchIndexError;
