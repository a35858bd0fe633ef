//! PostgreSQL implementation of the catalog repository.
//!
//! Reads the `car_brand` / `car_series` / `car_model` hierarchy and flattens models into
//! index documents with a single joined query per chunk of IDs.

use async_trait::async_trait;
use catalog_indexer_shared::{IndexDocument, ModelId, SourceTable, TagValue};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};

use crate::errors::CatalogError;
use crate::interfaces::CatalogRepository;

const FETCH_DOCUMENTS_SQL: &str = r#"
    SELECT
        m.id,
        m.name,
        m.year,
        m.price_guidance::float8 AS price,
        m.status,
        m.extra_tags,
        m.updated_at,
        s.name AS series_name,
        s.level AS series_level,
        s.energy_type,
        b.name AS brand_name
    FROM car_model m
    LEFT JOIN car_series s ON s.id = m.series_id
    LEFT JOIN car_brand b ON b.id = s.brand_id
    WHERE m.id = ANY($1)
    ORDER BY m.id
"#;

const MODELS_BY_SERIES_SQL: &str =
    "SELECT id FROM car_model WHERE series_id = ANY($1) ORDER BY id";

const MODELS_BY_BRAND_SQL: &str = r#"
    SELECT m.id
    FROM car_model m
    JOIN car_series s ON s.id = m.series_id
    WHERE s.brand_id = ANY($1)
    ORDER BY m.id
"#;

const LIST_MODEL_IDS_SQL: &str =
    "SELECT id FROM car_model WHERE ($1::BIGINT IS NULL OR id > $1) ORDER BY id LIMIT $2";

/// A model row joined with its series and brand.
#[derive(sqlx::FromRow)]
struct ModelRow {
    id: i64,
    name: String,
    year: Option<String>,
    price: Option<f64>,
    status: Option<i32>,
    extra_tags: Option<serde_json::Value>,
    updated_at: Option<DateTime<Utc>>,
    series_name: Option<String>,
    series_level: Option<String>,
    energy_type: Option<String>,
    brand_name: Option<String>,
}

impl From<ModelRow> for IndexDocument {
    fn from(row: ModelRow) -> Self {
        IndexDocument {
            id: row.id,
            name: row.name,
            price: row.price.unwrap_or(0.0),
            year: row.year.unwrap_or_default(),
            status: row.status.unwrap_or(1),
            tags_text: TagValue::from_json(row.extra_tags.as_ref()).to_search_text(),
            updated_at: row.updated_at,
            series_name: row.series_name.unwrap_or_default(),
            series_level: row.series_level.unwrap_or_default(),
            energy_type: row.energy_type.unwrap_or_default(),
            brand_name: row.brand_name.unwrap_or_default(),
        }
    }
}

/// PostgreSQL-backed catalog repository.
pub struct PostgresCatalogRepository {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl PostgresCatalogRepository {
    /// Creates a repository on top of an existing pool.
    ///
    /// # Arguments
    ///
    /// * `pool` - Configured PostgreSQL connection pool with the catalog schema
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the catalog database.
    ///
    /// # Arguments
    ///
    /// * `database_url` - PostgreSQL connection URL
    /// * `max_connections` - Upper bound of the pool size
    ///
    /// # Returns
    ///
    /// * `Ok(PostgresCatalogRepository)` - Ready-to-use repository instance
    /// * `Err(CatalogError)` - If the pool cannot be created
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, CatalogError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!(max_connections = max_connections, "Connected to catalog database");
        Ok(Self { pool })
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn fetch_documents(&self, ids: &[ModelId]) -> Result<Vec<IndexDocument>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<ModelRow> = sqlx::query_as(FETCH_DOCUMENTS_SQL)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        debug!(requested = ids.len(), found = rows.len(), "Fetched model rows");
        Ok(rows.into_iter().map(IndexDocument::from).collect())
    }

    async fn resolve_parent(
        &self,
        table: SourceTable,
        ids: &[i64],
    ) -> Result<Vec<ModelId>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = match table {
            SourceTable::Series => MODELS_BY_SERIES_SQL,
            SourceTable::Brand => MODELS_BY_BRAND_SQL,
            SourceTable::Model => {
                return Err(CatalogError::UnsupportedTable(table.to_string()));
            }
        };

        let model_ids = sqlx::query_scalar::<_, i64>(sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        debug!(
            table = %table,
            parents = ids.len(),
            models = model_ids.len(),
            "Resolved parent rows to models"
        );
        Ok(model_ids)
    }

    async fn list_model_ids(
        &self,
        after: Option<ModelId>,
        limit: usize,
    ) -> Result<Vec<ModelId>, CatalogError> {
        let limit = i64::try_from(limit)
            .map_err(|_| CatalogError::mapping(format!("Page size {} is too large", limit)))?;

        let ids = sqlx::query_scalar::<_, i64>(LIST_MODEL_IDS_SQL)
            .bind(after)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}
