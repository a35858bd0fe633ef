//! Orchestrator module for the catalog indexer.
//!
//! Runs the intake loop, the flusher and the progress logger around a shared
//! [`SmartBuffer`], and drains the buffer once more on shutdown.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

use crate::buffer::SmartBuffer;
use crate::consumer::ChangeSource;
use crate::errors::IngestError;
use crate::metrics::{MetricsSnapshot, SyncMetrics};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How often the flusher checks the idle condition.
    pub flush_tick: Duration,
    /// Maximum time a non-empty buffer waits before being flushed.
    pub max_wait: Duration,
    /// Interval of the progress log line.
    pub progress_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            flush_tick: Duration::from_millis(500),
            max_wait: Duration::from_millis(2000),
            progress_interval: Duration::from_secs(10),
        }
    }
}

/// Orchestrator that coordinates the sync pipeline.
///
/// The orchestrator:
/// - Subscribes the change source and feeds its records into the buffer
/// - Suspends intake while the buffer applies backpressure
/// - Flushes on soft-limit requests and when the buffer has been idle for `max_wait`
/// - Logs progress and handles shutdown signals
pub struct Orchestrator {
    source: Arc<dyn ChangeSource>,
    buffer: Arc<SmartBuffer>,
    metrics: Arc<SyncMetrics>,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        source: Arc<dyn ChangeSource>,
        buffer: Arc<SmartBuffer>,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        Self::with_config(source, buffer, metrics, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        source: Arc<dyn ChangeSource>,
        buffer: Arc<SmartBuffer>,
        metrics: Arc<SyncMetrics>,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            source,
            buffer,
            metrics,
            config,
            shutdown_tx,
        }
    }

    /// Run the orchestrator.
    ///
    /// Blocks until a shutdown signal is received or the change source ends, then
    /// drains the buffer with a final flush.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), IngestError> {
        info!("Starting catalog indexer orchestrator");

        self.source.subscribe()?;

        let mut intake_handle = tokio::spawn(intake_loop(
            self.source.clone(),
            self.buffer.clone(),
            self.shutdown_tx.subscribe(),
        ));
        let flusher_handle = tokio::spawn(flusher_loop(
            self.buffer.clone(),
            self.config.clone(),
            self.shutdown_tx.subscribe(),
        ));

        info!("Ready to process change events");

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut progress_timer = interval(self.config.progress_interval);
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Skip the first tick immediately
        progress_timer.tick().await;

        let mut progress = ProgressTracker::new(self.metrics.snapshot());
        let mut intake_done = false;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break;
                }
                result = &mut intake_handle => {
                    intake_done = true;
                    match result {
                        Ok(()) => info!("Change stream ended"),
                        Err(e) => error!(error = %e, "Intake task failed"),
                    }
                    break;
                }
                _ = progress_timer.tick() => {
                    progress.log(self.metrics.snapshot());
                }
            }
        }

        let _ = self.shutdown_tx.send(());
        if !intake_done {
            let _ = intake_handle.await;
        }
        let _ = flusher_handle.await;

        // Final drain: whatever was consumed is flushed and committed before exit
        let report = self.buffer.flush().await;
        debug!(report = ?report, "Final flush completed");

        let totals = self.metrics.snapshot();
        info!(
            events_received = totals.events_received,
            documents_upserted = totals.documents_upserted,
            documents_deleted = totals.documents_deleted,
            dead_lettered = totals.dead_lettered,
            unknown_table_events = totals.unknown_table_events,
            commits = totals.commits,
            "Orchestrator shutdown complete"
        );
        Ok(())
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub fn buffer(&self) -> &Arc<SmartBuffer> {
        &self.buffer
    }

    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }
}

/// Read records from the source into the buffer, waiting while intake is paused.
async fn intake_loop(
    source: Arc<dyn ChangeSource>,
    buffer: Arc<SmartBuffer>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut paused = buffer.paused_watch();

    loop {
        loop {
            let is_paused = *paused.borrow_and_update();
            if !is_paused {
                break;
            }
            debug!("Intake paused, waiting for the buffer to drain");
            tokio::select! {
                _ = shutdown.recv() => return,
                changed = paused.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        tokio::select! {
            _ = shutdown.recv() => {
                info!("Intake received shutdown signal");
                return;
            }
            record = source.next_record() => {
                match record {
                    Ok(Some(record)) => {
                        buffer.add_record(record).await;
                    }
                    Ok(None) => return,
                    Err(e) => {
                        error!(error = %e, "Change source error");
                    }
                }
            }
        }
    }
}

/// Flush on soft-limit requests and when the buffer has been idle for `max_wait`.
async fn flusher_loop(
    buffer: Arc<SmartBuffer>,
    config: OrchestratorConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(config.flush_tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("Flusher received shutdown signal");
                return;
            }
            _ = buffer.flush_requested() => {
                debug!("Flushing on soft limit");
                buffer.flush().await;
            }
            _ = ticker.tick() => {
                if buffer.idle_flush_due(config.max_wait).await {
                    debug!("Flushing idle buffer");
                    buffer.flush().await;
                }
            }
        }
    }
}

/// Rates between two progress log lines.
struct ProgressTracker {
    previous: MetricsSnapshot,
    previous_time: Instant,
}

impl ProgressTracker {
    fn new(initial: MetricsSnapshot) -> Self {
        Self {
            previous: initial,
            previous_time: Instant::now(),
        }
    }

    fn log(&mut self, current: MetricsSnapshot) {
        let now = Instant::now();
        let elapsed_secs = now.duration_since(self.previous_time).as_secs_f64();

        let rate = |current: u64, previous: u64| {
            if elapsed_secs > 0.0 {
                (current.saturating_sub(previous) as f64) / elapsed_secs
            } else {
                0.0
            }
        };

        let events_per_sec = rate(current.events_received, self.previous.events_received);
        let docs_per_sec = rate(
            current.documents_applied(),
            self.previous.documents_applied(),
        );

        info!(
            events_received = current.events_received,
            documents_upserted = current.documents_upserted,
            documents_deleted = current.documents_deleted,
            retries_scheduled = current.retries_scheduled,
            dead_lettered = current.dead_lettered,
            events_per_sec = format!("{:.2}", events_per_sec),
            documents_per_sec = format!("{:.2}", docs_per_sec),
            "Processing progress"
        );

        self.previous = current;
        self.previous_time = now;
    }
}
