//! Interface definitions for the catalog indexer's external collaborators.
//!
//! This module defines the abstract `CatalogRepository` and `SearchIndexProvider` traits
//! that allow for dependency injection and swappable backend implementations.

mod catalog_repository;
mod search_index_provider;

pub use catalog_repository::CatalogRepository;
pub use search_index_provider::SearchIndexProvider;
