//! Hand-written mocks of the pipeline's collaborators, shared by the unit tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;

use async_trait::async_trait;
use catalog_indexer_repository::{
    BulkAction, BulkApplySummary, BulkOperationResult, CatalogError, CatalogRepository,
    SearchIndexError, SearchIndexProvider,
};
use catalog_indexer_shared::{IndexDocument, ModelId, SourceTable};

use crate::consumer::{ChangeSource, OffsetMap, SourceRecord};
use crate::errors::IngestError;

// ============================================================================
// Catalog
// ============================================================================

#[derive(Default)]
pub struct MockCatalog {
    models: Mutex<BTreeMap<ModelId, (i64, IndexDocument)>>,
    series_brand: Mutex<BTreeMap<i64, i64>>,
    fail_resolve: AtomicBool,
    fail_fetch: AtomicBool,
    resolve_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 2 brands, 3 series, 5 models.
    pub fn fixture() -> Self {
        Self::new()
            .with_named_series(10, 1, "BYD", "Qin PLUS", &[100, 101])
            .with_named_series(11, 1, "BYD", "Han", &[102])
            .with_named_series(20, 2, "Audi", "A4L", &[200, 201])
    }

    pub fn with_series(self, series_id: i64, brand_id: i64, model_ids: &[ModelId]) -> Self {
        self.with_named_series(
            series_id,
            brand_id,
            &format!("brand {}", brand_id),
            &format!("series {}", series_id),
            model_ids,
        )
    }

    pub fn with_named_series(
        self,
        series_id: i64,
        brand_id: i64,
        brand_name: &str,
        series_name: &str,
        model_ids: &[ModelId],
    ) -> Self {
        self.series_brand.lock().unwrap().insert(series_id, brand_id);
        let mut models = self.models.lock().unwrap();
        for id in model_ids {
            let mut doc = IndexDocument::new(*id, format!("model {}", id));
            doc.brand_name = brand_name.to_string();
            doc.series_name = series_name.to_string();
            models.insert(*id, (series_id, doc));
        }
        drop(models);
        self
    }

    pub fn remove_model(&self, id: ModelId) {
        self.models.lock().unwrap().remove(&id);
    }

    pub fn fail_resolve(&self, fail: bool) {
        self.fail_resolve.store(fail, Ordering::SeqCst);
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogRepository for MockCatalog {
    async fn fetch_documents(&self, ids: &[ModelId]) -> Result<Vec<IndexDocument>, CatalogError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(CatalogError::mapping("mock fetch failure"));
        }
        let models = self.models.lock().unwrap();
        let wanted: BTreeSet<ModelId> = ids.iter().copied().collect();
        Ok(models
            .iter()
            .filter(|(id, _)| wanted.contains(*id))
            .map(|(_, (_, doc))| doc.clone())
            .collect())
    }

    async fn resolve_parent(
        &self,
        table: SourceTable,
        ids: &[i64],
    ) -> Result<Vec<ModelId>, CatalogError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(CatalogError::mapping("mock resolve failure"));
        }
        let series_brand = self.series_brand.lock().unwrap();
        let models = self.models.lock().unwrap();
        let series: BTreeSet<i64> = match table {
            SourceTable::Series => ids.iter().copied().collect(),
            SourceTable::Brand => series_brand
                .iter()
                .filter(|(_, brand)| ids.contains(*brand))
                .map(|(series, _)| *series)
                .collect(),
            SourceTable::Model => return Err(CatalogError::UnsupportedTable(table.to_string())),
        };
        Ok(models
            .iter()
            .filter(|(_, (series_id, _))| series.contains(series_id))
            .map(|(id, _)| *id)
            .collect())
    }

    async fn list_model_ids(
        &self,
        after: Option<ModelId>,
        limit: usize,
    ) -> Result<Vec<ModelId>, CatalogError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(CatalogError::mapping("mock list failure"));
        }
        let models = self.models.lock().unwrap();
        Ok(models
            .keys()
            .copied()
            .filter(|id| after.map_or(true, |a| *id > a))
            .take(limit)
            .collect())
    }
}

// ============================================================================
// Search index
// ============================================================================

#[derive(Default)]
pub struct MockSearchIndex {
    documents: Mutex<BTreeMap<ModelId, IndexDocument>>,
    deleted: Mutex<Vec<ModelId>>,
    upserted: Mutex<Vec<ModelId>>,
    rejected: Mutex<BTreeSet<ModelId>>,
    requests: Mutex<Vec<usize>>,
    fail_requests: AtomicBool,
    resets: AtomicUsize,
    hold: AtomicBool,
    entered: Notify,
    released: Notify,
}

impl MockSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_ids(&self, ids: &[ModelId]) {
        self.rejected.lock().unwrap().extend(ids.iter().copied());
    }

    pub fn accept_all(&self) {
        self.rejected.lock().unwrap().clear();
    }

    pub fn fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    /// Block bulk requests until `release_requests` is called.
    pub fn hold_requests(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    /// Wait until a held bulk request has arrived.
    pub async fn request_arrived(&self) {
        self.entered.notified().await
    }

    pub fn release_requests(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.released.notify_one();
    }

    pub fn insert(&self, doc: IndexDocument) {
        self.documents.lock().unwrap().insert(doc.id, doc);
    }

    /// IDs currently in the index.
    pub fn document_ids(&self) -> Vec<ModelId> {
        self.documents.lock().unwrap().keys().copied().collect()
    }

    pub fn documents(&self) -> BTreeMap<ModelId, IndexDocument> {
        self.documents.lock().unwrap().clone()
    }

    /// Every successful upsert in order.
    pub fn upserted_ids(&self) -> Vec<ModelId> {
        self.upserted.lock().unwrap().clone()
    }

    /// Every successful delete in order.
    pub fn deleted_ids(&self) -> Vec<ModelId> {
        self.deleted.lock().unwrap().clone()
    }

    /// Operation count of every bulk request received.
    pub fn request_sizes(&self) -> Vec<usize> {
        self.requests.lock().unwrap().clone()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchIndexProvider for MockSearchIndex {
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(SearchIndexError::connection("mock cluster unreachable"));
        }
        Ok(())
    }

    async fn reset_index(&self) -> Result<(), SearchIndexError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.documents.lock().unwrap().clear();
        Ok(())
    }

    async fn bulk_apply(
        &self,
        upserts: &[IndexDocument],
        deletes: &[ModelId],
    ) -> Result<BulkApplySummary, SearchIndexError> {
        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.released.notified().await;
        }

        self.requests.lock().unwrap().push(upserts.len() + deletes.len());
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(SearchIndexError::bulk_request("mock transport failure"));
        }

        let rejected = self.rejected.lock().unwrap().clone();
        let mut documents = self.documents.lock().unwrap();
        let mut results = Vec::new();

        for doc in upserts {
            if rejected.contains(&doc.id) {
                results.push(BulkOperationResult::failed(
                    doc.id,
                    BulkAction::Index,
                    SearchIndexError::index("mapper_parsing_exception"),
                ));
            } else {
                documents.insert(doc.id, doc.clone());
                self.upserted.lock().unwrap().push(doc.id);
                results.push(BulkOperationResult::ok(doc.id, BulkAction::Index));
            }
        }

        for id in deletes {
            if rejected.contains(id) {
                results.push(BulkOperationResult::failed(
                    *id,
                    BulkAction::Delete,
                    SearchIndexError::delete("rejected"),
                ));
            } else {
                documents.remove(id);
                self.deleted.lock().unwrap().push(*id);
                results.push(BulkOperationResult::ok(*id, BulkAction::Delete));
            }
        }

        Ok(BulkApplySummary::from_results(results))
    }
}

// ============================================================================
// Change source
// ============================================================================

#[derive(Default)]
pub struct MockSource {
    records: Mutex<VecDeque<SourceRecord>>,
    paused: AtomicBool,
    pause_calls: AtomicUsize,
    resume_calls: AtomicUsize,
    commits: Mutex<Vec<OffsetMap>>,
    fail_commit: AtomicBool,
    fail_resume: AtomicBool,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<SourceRecord>) -> Self {
        let source = Self::new();
        source.records.lock().unwrap().extend(records);
        source
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn pause_calls(&self) -> usize {
        self.pause_calls.load(Ordering::SeqCst)
    }

    pub fn resume_calls(&self) -> usize {
        self.resume_calls.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> Vec<OffsetMap> {
        self.commits.lock().unwrap().clone()
    }

    pub fn fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn fail_resume(&self, fail: bool) {
        self.fail_resume.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChangeSource for MockSource {
    fn subscribe(&self) -> Result<(), IngestError> {
        Ok(())
    }

    async fn next_record(&self) -> Result<Option<SourceRecord>, IngestError> {
        Ok(self.records.lock().unwrap().pop_front())
    }

    fn pause(&self) -> Result<(), IngestError> {
        self.pause_calls.fetch_add(1, Ordering::SeqCst);
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&self) -> Result<(), IngestError> {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_resume.load(Ordering::SeqCst) {
            return Err(IngestError::kafka("mock resume failure"));
        }
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self, offsets: &OffsetMap) -> Result<(), IngestError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(IngestError::kafka("mock commit failure"));
        }
        self.commits.lock().unwrap().push(offsets.clone());
        Ok(())
    }
}
