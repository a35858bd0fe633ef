//! Index document types for the search index.
//!
//! This module defines the flattened car model document that is indexed in the search engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical document ID: the primary key of a `car_model` row.
pub type ModelId = i64;

/// Document representation for the search index.
///
/// One document per car model, denormalized with the attributes of its series and
/// brand. Documents are always rebuilt in full from the catalog and written with an
/// index (overwrite) operation, never patched, so writing the same document twice
/// leaves the index unchanged.
///
/// # Fields
///
/// - `id`: The model ID, also used as the search document ID
/// - `name`: Model trim name (primary search field)
/// - `price`: Guidance price, `0.0` when the catalog has none
/// - `year`: Model year
/// - `status`: Sales status (1 on sale, 0 discontinued, 2 upcoming)
/// - `tags_text`: Flattened marketing tags
/// - `updated_at`: Last modification time of the model row
/// - `series_name`, `series_level`, `energy_type`: Attributes of the parent series
/// - `brand_name`: Name of the grandparent brand
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexDocument {
    pub id: ModelId,
    pub name: String,
    pub price: f64,
    pub year: String,
    pub status: i32,
    pub tags_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub series_name: String,
    pub series_level: String,
    pub energy_type: String,
    pub brand_name: String,
}

impl IndexDocument {
    /// Create a document for a model without parent attributes.
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_indexer_shared::IndexDocument;
    ///
    /// let doc = IndexDocument::new(7, "2026 Champion DM-i 120km");
    /// assert_eq!(doc.document_id(), "7");
    /// ```
    pub fn new(id: ModelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            price: 0.0,
            year: String::new(),
            status: 1,
            tags_text: String::new(),
            updated_at: None,
            series_name: String::new(),
            series_level: String::new(),
            energy_type: String::new(),
            brand_name: String::new(),
        }
    }

    /// Generate the document ID used in the search index.
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }
}
