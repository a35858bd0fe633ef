//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate and its `_bulk` API.

use async_trait::async_trait;
use catalog_indexer_shared::{IndexDocument, ModelId};
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{
        IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesPutAliasParts,
    },
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::types::{BulkAction, BulkApplySummary, BulkOperationResult};

/// OpenSearch provider implementation.
///
/// Writes car model documents through the index alias so that a reindex into a new
/// versioned index can be swapped in without touching the indexer.
///
/// # Example
///
/// ```ignore
/// use catalog_indexer_repository::opensearch::IndexConfig;
/// let config = IndexConfig::new("cars", 1);
/// let provider = OpenSearchProvider::new("http://localhost:9200", config).await?;
/// provider.ensure_index_exists().await?;
///
/// let summary = provider
///     .bulk_apply(&[IndexDocument::new(7, "Qin PLUS")], &[8])
///     .await?;
/// assert_eq!(summary.failed, 0);
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The index configuration containing alias, version and analyzer
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            alias = %index_config.alias,
            version = index_config.version,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// Build the newline-delimited body of a bulk request.
    ///
    /// Upserts become an `index` action followed by the full document; deletes become a
    /// lone `delete` action. The document ID is the model ID.
    fn bulk_lines(
        upserts: &[IndexDocument],
        deletes: &[ModelId],
    ) -> Result<Vec<Value>, SearchIndexError> {
        let mut lines = Vec::with_capacity(upserts.len() * 2 + deletes.len());

        for doc in upserts {
            lines.push(json!({ "index": { "_id": doc.document_id() } }));
            lines.push(
                serde_json::to_value(doc)
                    .map_err(|e| SearchIndexError::serialization(e.to_string()))?,
            );
        }
        for id in deletes {
            lines.push(json!({ "delete": { "_id": id.to_string() } }));
        }

        Ok(lines)
    }

    /// Classify the items of a bulk response.
    ///
    /// Items are matched to requests by position, which the bulk API guarantees. Items the
    /// response does not account for are reported as failed so no ID is silently lost.
    fn parse_bulk_response(
        response: &Value,
        expected: &[(ModelId, BulkAction)],
    ) -> BulkApplySummary {
        let items = response["items"].as_array().map(Vec::as_slice).unwrap_or(&[]);
        let mut results = Vec::with_capacity(expected.len());

        for (position, (id, action)) in expected.iter().enumerate() {
            let key = match action {
                BulkAction::Index => "index",
                BulkAction::Delete => "delete",
            };

            let Some(item) = items.get(position).map(|i| &i[key]).filter(|i| i.is_object())
            else {
                results.push(BulkOperationResult::failed(
                    *id,
                    *action,
                    SearchIndexError::parse(format!("Missing bulk response item for id {}", id)),
                ));
                continue;
            };

            let status = item["status"].as_u64().unwrap_or(0);
            if (200..300).contains(&status) {
                results.push(BulkOperationResult::ok(*id, *action));
                continue;
            }

            // Absence is the desired end state of a delete
            if *action == BulkAction::Delete && status == 404 {
                results.push(BulkOperationResult::ok(*id, *action));
                continue;
            }

            let reason = item["error"]["reason"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| item["error"].to_string());
            let error = match action {
                BulkAction::Index => {
                    SearchIndexError::index(format!("status {}: {}", status, reason))
                }
                BulkAction::Delete => {
                    SearchIndexError::delete(format!("status {}: {}", status, reason))
                }
            };
            results.push(BulkOperationResult::failed(*id, *action, error));
        }

        BulkApplySummary::from_results(results)
    }

    /// Create the versioned index with mappings and alias.
    async fn create_index(&self) -> Result<(), SearchIndexError> {
        let index_name = self.index_config.versioned_index_name();

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&index_name))
            .body(get_index_settings(&self.index_config))
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            info!(index = %index_name, alias = %self.index_config.alias, "Created search index");
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_default();
        if error_body.contains("resource_already_exists_exception") {
            // The versioned index survived without its alias: re-attach it
            warn!(index = %index_name, "Index exists without alias, attaching alias");
            return self.put_alias(&index_name).await;
        }

        error!(status = %status, body = %error_body, "Index creation failed");
        Err(SearchIndexError::index_creation(format!(
            "Create index {} failed with status {}: {}",
            index_name, status, error_body
        )))
    }

    async fn put_alias(&self, index_name: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .put_alias(IndicesPutAliasParts::IndexName(
                &[index_name],
                &self.index_config.alias,
            ))
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::index_creation(format!(
                "Put alias failed with status {}: {}",
                status, error_body
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        let alias = self.index_config.alias.as_str();

        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[alias]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if response.status_code().is_success() {
            debug!(alias = %alias, "Search index already exists");
            return Ok(());
        }

        self.create_index().await
    }

    async fn reset_index(&self) -> Result<(), SearchIndexError> {
        let index_name = self.index_config.versioned_index_name();

        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index_name.as_str()]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - the index may never have been created
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete index request failed");
            return Err(SearchIndexError::index_creation(format!(
                "Delete index {} failed with status {}: {}",
                index_name, status, error_body
            )));
        }

        info!(index = %index_name, "Dropped search index");
        self.create_index().await
    }

    /// Apply upserts and deletes with a single `_bulk` request.
    ///
    /// A transport failure or a non-2xx response for the request as a whole is returned
    /// as `Err`; per-item failures are reported in the summary.
    async fn bulk_apply(
        &self,
        upserts: &[IndexDocument],
        deletes: &[ModelId],
    ) -> Result<BulkApplySummary, SearchIndexError> {
        if upserts.is_empty() && deletes.is_empty() {
            return Ok(BulkApplySummary::default());
        }

        let body: Vec<JsonBody<Value>> = Self::bulk_lines(upserts, deletes)?
            .into_iter()
            .map(JsonBody::new)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(&self.index_config.alias))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_request(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::bulk_request(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let response_body = response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let expected: Vec<(ModelId, BulkAction)> = upserts
            .iter()
            .map(|d| (d.id, BulkAction::Index))
            .chain(deletes.iter().map(|id| (*id, BulkAction::Delete)))
            .collect();

        let summary = Self::parse_bulk_response(&response_body, &expected);
        debug!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk request applied"
        );
        Ok(summary)
    }
}
