//! SmartBuffer: the flow controller of the sync pipeline.
//!
//! Accumulates change events, decides when to flush, pauses the change source when it
//! falls behind, tracks retries, hands exhausted items to the dead-letter sink and
//! commits consumed offsets once a flush cycle has settled.
//!
//! ## Locking
//!
//! All buffer state lives in one [`BufferState`] behind a single lock that is only held
//! for snapshot, insert and restore. Catalog and index I/O happen outside of it, so intake
//! keeps accepting events while a flush is in flight. A second lock serialises flush
//! cycles.

mod dead_letter;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use catalog_indexer_shared::{ChangeEvent, ModelId};
use tokio::sync::{watch, Mutex, Notify};
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::assembler::DocumentAssembler;
use crate::consumer::{ChangeSource, OffsetMap, SourcePosition, SourceRecord};
use crate::loader::IndexWriter;
use crate::metrics::SyncMetrics;
use crate::resolver::EntityResolver;

pub use dead_letter::{DeadLetter, DeadLetterSink, LogDeadLetterSink};

/// Thresholds of the flow controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    /// Buffer size at which a flush is requested.
    pub soft_limit: usize,
    /// Buffer size at which intake is paused. Must be greater than `soft_limit`.
    pub hard_limit: usize,
    /// Failures tolerated per ID before it is dead-lettered.
    pub max_retries: u32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            soft_limit: 1000,
            hard_limit: 5000,
            max_retries: 3,
        }
    }
}

/// Result of adding events to the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOutcome {
    /// The soft limit was reached and the flusher was woken up.
    pub flush_requested: bool,
    /// Intake is paused.
    pub paused: bool,
}

/// Summary of one flush cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Distinct events taken from the pending set.
    pub events: usize,
    /// IDs carried over from the retry map.
    pub retried_ids: usize,
    /// Canonical IDs processed in this cycle.
    pub resolved_ids: usize,
    pub upserted: usize,
    pub deleted: usize,
    /// IDs and events sent back to the retry path.
    pub failed: usize,
    pub dead_lettered: usize,
    /// Events from tables outside the catalog.
    pub unknown: usize,
    /// Whether the offset commit succeeded.
    pub committed: bool,
}

impl FlushReport {
    /// True when the buffer was empty and nothing was done.
    pub fn is_noop(&self) -> bool {
        *self == FlushReport::default()
    }
}

struct BufferState {
    pending: HashSet<ChangeEvent>,
    retry: HashMap<ModelId, u32>,
    /// Failed resolution attempts of events currently in `pending`.
    event_attempts: HashMap<ChangeEvent, u32>,
    offsets: OffsetMap,
    last_flush: Instant,
    paused: bool,
}

impl BufferState {
    fn size(&self) -> usize {
        self.pending.len() + self.retry.len()
    }

    fn has_work(&self) -> bool {
        self.size() > 0 || !self.offsets.is_empty()
    }
}

/// Snapshot taken at flush start.
struct FlushBatch {
    events: Vec<ChangeEvent>,
    retry: HashMap<ModelId, u32>,
    event_attempts: HashMap<ChangeEvent, u32>,
    offsets: OffsetMap,
}

/// Flow controller between the change source and the index.
pub struct SmartBuffer {
    config: BufferConfig,
    state: Mutex<BufferState>,
    flush_guard: Mutex<()>,
    flush_notify: Notify,
    paused_tx: watch::Sender<bool>,
    source: Arc<dyn ChangeSource>,
    resolver: EntityResolver,
    assembler: DocumentAssembler,
    writer: IndexWriter,
    dead_letters: Arc<dyn DeadLetterSink>,
    metrics: Arc<SyncMetrics>,
}

impl SmartBuffer {
    /// Create an empty buffer.
    ///
    /// # Arguments
    ///
    /// * `config` - Flush and backpressure thresholds
    /// * `source` - Change source to pause, resume and commit
    /// * `resolver` - Maps events to canonical IDs
    /// * `assembler` - Fetches documents for canonical IDs
    /// * `writer` - Applies documents to the index
    /// * `dead_letters` - Receives items that exhausted their retries
    /// * `metrics` - Shared pipeline counters
    pub fn new(
        config: BufferConfig,
        source: Arc<dyn ChangeSource>,
        resolver: EntityResolver,
        assembler: DocumentAssembler,
        writer: IndexWriter,
        dead_letters: Arc<dyn DeadLetterSink>,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        let (paused_tx, _) = watch::channel(false);

        Self {
            config,
            state: Mutex::new(BufferState {
                pending: HashSet::new(),
                retry: HashMap::new(),
                event_attempts: HashMap::new(),
                offsets: OffsetMap::new(),
                last_flush: Instant::now(),
                paused: false,
            }),
            flush_guard: Mutex::new(()),
            flush_notify: Notify::new(),
            paused_tx,
            source,
            resolver,
            assembler,
            writer,
            dead_letters,
            metrics,
        }
    }

    /// Add a single change event.
    pub async fn add_event(&self, event: ChangeEvent) -> AddOutcome {
        self.add_events(vec![event], None).await
    }

    /// Add the events of a source record and remember its position for the next commit.
    pub async fn add_record(&self, record: SourceRecord) -> AddOutcome {
        self.add_events(record.events, Some(&record.position)).await
    }

    async fn add_events(
        &self,
        events: Vec<ChangeEvent>,
        position: Option<&SourcePosition>,
    ) -> AddOutcome {
        SyncMetrics::add(&self.metrics.events_received, events.len());

        let mut state = self.state.lock().await;
        state.pending.extend(events);
        if let Some(position) = position {
            state.offsets.record(position);
        }
        self.apply_backpressure(&mut state);

        let outcome = AddOutcome {
            flush_requested: state.size() >= self.config.soft_limit,
            paused: state.paused,
        };
        drop(state);

        if outcome.flush_requested {
            self.flush_notify.notify_one();
        }
        outcome
    }

    /// Count a failure for each ID and keep it for the next cycle.
    ///
    /// IDs whose failure count exceeds `max_retries` are removed and dead-lettered.
    ///
    /// # Returns
    ///
    /// The entries that were dead-lettered.
    pub async fn add_retry_ids(&self, ids: &[ModelId]) -> Vec<DeadLetter> {
        let dead = {
            let mut state = self.state.lock().await;
            let dead = self.schedule_retries(&mut state, ids.iter().copied());
            self.apply_backpressure(&mut state);
            dead
        };
        self.record_dead_letters(&dead).await;
        dead
    }

    /// Run one flush cycle.
    ///
    /// Only one cycle runs at a time; a caller arriving during a flush waits for it and
    /// then flushes whatever accumulated meanwhile. The offset commit is attempted exactly
    /// once per cycle that had work, after every retry has been scheduled.
    #[instrument(skip(self))]
    pub async fn flush(&self) -> FlushReport {
        let _flush = self.flush_guard.lock().await;

        let Some(batch) = self.take_batch().await else {
            return FlushReport::default();
        };

        let mut report = FlushReport {
            events: batch.events.len(),
            retried_ids: batch.retry.len(),
            ..FlushReport::default()
        };

        let resolution = self.resolver.resolve(&batch.events).await;
        report.unknown = resolution.unknown.len();

        let mut ids = resolution.ids;
        ids.extend(batch.retry.keys().copied());
        let ids: Vec<ModelId> = ids.into_iter().collect();
        report.resolved_ids = ids.len();

        let assembly = self.assembler.assemble(&ids).await;
        let written = self.writer.write(&assembly.found, &assembly.missing).await;
        report.upserted = written.upserted;
        report.deleted = written.deleted;

        let mut failed_ids: BTreeSet<ModelId> = written.failed;
        failed_ids.extend(assembly.failed);
        report.failed = failed_ids.len() + resolution.unresolved.len();

        let dead = {
            let mut state = self.state.lock().await;

            // Failures counted by add_retry_ids while the I/O was in flight are kept
            for id in &failed_ids {
                let prior = batch.retry.get(id).copied().unwrap_or(0);
                *state.retry.entry(*id).or_insert(0) += prior;
            }
            let mut dead = self.schedule_retries(&mut state, failed_ids.iter().copied());
            dead.extend(self.requeue_events(
                &mut state,
                resolution.unresolved,
                &batch.event_attempts,
            ));

            self.apply_backpressure(&mut state);
            dead
        };
        report.dead_lettered = dead.len();
        self.record_dead_letters(&dead).await;

        report.committed = self.commit(batch.offsets).await;

        SyncMetrics::add(&self.metrics.flushes, 1);
        SyncMetrics::add(&self.metrics.documents_upserted, report.upserted);
        SyncMetrics::add(&self.metrics.documents_deleted, report.deleted);

        info!(
            events = report.events,
            retried = report.retried_ids,
            ids = report.resolved_ids,
            upserted = report.upserted,
            deleted = report.deleted,
            failed = report.failed,
            dead_lettered = report.dead_lettered,
            committed = report.committed,
            "Flush completed"
        );
        report
    }

    /// Snapshot and clear the buffer, resuming intake if it was paused.
    ///
    /// An empty buffer still gets its pause state reconciled, so a resume that failed
    /// earlier is retried by the next flush.
    async fn take_batch(&self) -> Option<FlushBatch> {
        let mut state = self.state.lock().await;

        let batch = if state.has_work() {
            state.last_flush = Instant::now();
            Some(FlushBatch {
                events: state.pending.drain().collect(),
                retry: std::mem::take(&mut state.retry),
                event_attempts: std::mem::take(&mut state.event_attempts),
                offsets: std::mem::take(&mut state.offsets),
            })
        } else {
            None
        };

        self.apply_backpressure(&mut state);
        batch
    }

    fn schedule_retries(
        &self,
        state: &mut BufferState,
        ids: impl IntoIterator<Item = ModelId>,
    ) -> Vec<DeadLetter> {
        let mut dead = Vec::new();
        let mut scheduled = 0;

        for id in ids {
            let attempts = state.retry.get(&id).copied().unwrap_or(0) + 1;
            if attempts > self.config.max_retries {
                state.retry.remove(&id);
                dead.push(DeadLetter::Document { id, attempts });
            } else {
                state.retry.insert(id, attempts);
                scheduled += 1;
            }
        }

        SyncMetrics::add(&self.metrics.retries_scheduled, scheduled);
        dead
    }

    /// Put events whose fan-out failed back into the pending set.
    fn requeue_events(
        &self,
        state: &mut BufferState,
        events: Vec<ChangeEvent>,
        prior_attempts: &HashMap<ChangeEvent, u32>,
    ) -> Vec<DeadLetter> {
        let mut dead = Vec::new();
        let mut scheduled = 0;

        for event in events {
            let attempts = prior_attempts.get(&event).copied().unwrap_or(0) + 1;
            if attempts > self.config.max_retries {
                dead.push(DeadLetter::Event { event, attempts });
            } else {
                state.event_attempts.insert(event.clone(), attempts);
                state.pending.insert(event);
                scheduled += 1;
            }
        }

        SyncMetrics::add(&self.metrics.retries_scheduled, scheduled);
        dead
    }

    /// Pause intake at the hard limit and resume it once the buffer is below it again.
    ///
    /// The flag only drops when the source actually resumed; otherwise intake stays
    /// suspended and the resume is retried on the next call.
    fn apply_backpressure(&self, state: &mut BufferState) {
        let size = state.size();
        let over_limit = size >= self.config.hard_limit;

        if over_limit && !state.paused {
            if let Err(e) = self.source.pause() {
                warn!(error = %e, "Failed to pause change source");
            }
            state.paused = true;
            self.paused_tx.send_replace(true);
            warn!(
                buffer_size = size,
                hard_limit = self.config.hard_limit,
                "Buffer reached hard limit, pausing intake"
            );
        } else if !over_limit && state.paused {
            if let Err(e) = self.source.resume() {
                warn!(error = %e, "Failed to resume change source, intake stays paused");
                return;
            }
            state.paused = false;
            self.paused_tx.send_replace(false);
            info!(buffer_size = size, "Buffer below hard limit, resuming intake");
        }
    }

    async fn record_dead_letters(&self, dead: &[DeadLetter]) {
        for entry in dead {
            self.dead_letters.record(entry.clone()).await;
        }
    }

    async fn commit(&self, offsets: OffsetMap) -> bool {
        match self.source.commit(&offsets).await {
            Ok(()) => {
                SyncMetrics::add(&self.metrics.commits, 1);
                debug!(partitions = offsets.len(), "Committed consumed offsets");
                true
            }
            Err(e) => {
                SyncMetrics::add(&self.metrics.commit_failures, 1);
                error!(
                    partitions = offsets.len(),
                    error = %e,
                    "Offset commit failed, offsets kept for the next cycle"
                );
                self.state.lock().await.offsets.merge(offsets);
                false
            }
        }
    }

    /// Wait until a flush is requested by the soft limit.
    pub async fn flush_requested(&self) {
        self.flush_notify.notified().await
    }

    /// Whether the buffer holds work and has not been flushed for at least `max_wait`.
    ///
    /// Also true while intake is paused below the hard limit, i.e. after a failed resume.
    pub async fn idle_flush_due(&self, max_wait: Duration) -> bool {
        let state = self.state.lock().await;
        let stuck_paused = state.paused && state.size() < self.config.hard_limit;
        stuck_paused || (state.has_work() && state.last_flush.elapsed() >= max_wait)
    }

    /// Receiver tracking the paused flag.
    pub fn paused_watch(&self) -> watch::Receiver<bool> {
        self.paused_tx.subscribe()
    }

    pub async fn is_paused(&self) -> bool {
        self.state.lock().await.paused
    }

    /// Pending events plus IDs awaiting retry.
    pub async fn size(&self) -> usize {
        self.state.lock().await.size()
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Failure count of an ID awaiting retry.
    pub async fn retry_count(&self, id: ModelId) -> Option<u32> {
        self.state.lock().await.retry.get(&id).copied()
    }
}
