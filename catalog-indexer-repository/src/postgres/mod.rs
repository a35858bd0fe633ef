//! PostgreSQL implementation of the catalog repository.

mod catalog_repository;

pub use catalog_repository::PostgresCatalogRepository;
