use thiserror::Error;

#[derive(Debug, Error)]
/// Represents errors that can occur within the catalog repository.
///
/// This enum consolidates the failure modes of catalog reads, such as SQLx errors during
/// database operations and rows that cannot be mapped onto index documents.
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Fan-out is not defined for table {0}")]
    UnsupportedTable(String),

    #[error("Row mapping error: {0}")]
    MappingError(String),
}

impl CatalogError {
    /// Create a row mapping error.
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::MappingError(msg.into())
    }
}
