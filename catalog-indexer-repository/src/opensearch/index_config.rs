//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the car model search index.

use serde_json::{json, Value};

/// Default analyzer for the text fields.
///
/// Deployments with a CJK analysis plugin installed set `INDEX_ANALYZER` (e.g. `ik_smart`).
pub const DEFAULT_ANALYZER: &str = "standard";

/// Configuration for the search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The alias name for the search index (used for all operations).
    pub alias: String,
    /// The version number for the index (e.g., 1 for "cars_v1").
    pub version: u32,
    /// Analyzer applied to `name` and `tags_text`.
    pub analyzer: String,
}

impl IndexConfig {
    /// Create a new index configuration with the default analyzer.
    ///
    /// # Arguments
    ///
    /// * `alias` - The index alias name
    /// * `version` - The version number
    pub fn new(alias: impl Into<String>, version: u32) -> Self {
        Self {
            alias: alias.into(),
            version,
            analyzer: DEFAULT_ANALYZER.to_string(),
        }
    }

    /// Override the analyzer used for text fields.
    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = analyzer.into();
        self
    }

    /// The concrete index behind the alias (e.g., "cars_v1").
    pub fn versioned_index_name(&self) -> String {
        format!("{}_v{}", self.alias, self.version)
    }
}

/// Get the index settings and mappings for the car model search index.
///
/// The configuration includes:
/// - **text**: `name` (with a `raw` keyword sub-field for sorting) and `tags_text`
/// - **keyword**: brand / series / energy attributes for filtering and aggregation
/// - **numeric**: `price` for range filters, `status` for availability filters
///
/// The alias is attached at creation time so the index is reachable as soon as it exists.
pub fn get_index_settings(config: &IndexConfig) -> Value {
    let mut aliases = serde_json::Map::new();
    aliases.insert(config.alias.clone(), json!({}));

    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0,
            "refresh_interval": "1s"
        },
        "aliases": aliases,
        "mappings": {
            "properties": {
                "id": {
                    "type": "integer"
                },
                "name": {
                    "type": "text",
                    "analyzer": config.analyzer,
                    "fields": {
                        "raw": {
                            "type": "keyword"
                        }
                    }
                },
                "brand_name": {
                    "type": "keyword"
                },
                "series_name": {
                    "type": "keyword"
                },
                "series_level": {
                    "type": "keyword"
                },
                "energy_type": {
                    "type": "keyword"
                },
                "price": {
                    "type": "double"
                },
                "year": {
                    "type": "keyword"
                },
                "status": {
                    "type": "integer"
                },
                "tags_text": {
                    "type": "text",
                    "analyzer": config.analyzer
                },
                "updated_at": {
                    "type": "date"
                }
            }
        }
    })
}
