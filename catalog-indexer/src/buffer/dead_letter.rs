//! Dead-letter path for work that keeps failing.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use catalog_indexer_shared::{ChangeEvent, ModelId};
use tracing::error;

use crate::metrics::SyncMetrics;

/// An item dropped from the retry path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadLetter {
    /// A canonical document that could not be fetched or written.
    Document { id: ModelId, attempts: u32 },
    /// A change event whose fan-out could not be resolved.
    Event { event: ChangeEvent, attempts: u32 },
}

impl DeadLetter {
    pub fn attempts(&self) -> u32 {
        match self {
            DeadLetter::Document { attempts, .. } | DeadLetter::Event { attempts, .. } => *attempts,
        }
    }
}

impl fmt::Display for DeadLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadLetter::Document { id, .. } => write!(f, "document {}", id),
            DeadLetter::Event { event, .. } => write!(f, "event {}", event),
        }
    }
}

/// Receives permanently failing items.
///
/// Implementations may persist entries for manual replay. Recording must not fail: the
/// pipeline has already given up on the entry.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn record(&self, entry: DeadLetter);
}

/// Dead-letter sink that only logs.
pub struct LogDeadLetterSink {
    metrics: Arc<SyncMetrics>,
}

impl LogDeadLetterSink {
    pub fn new(metrics: Arc<SyncMetrics>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl DeadLetterSink for LogDeadLetterSink {
    async fn record(&self, entry: DeadLetter) {
        SyncMetrics::add(&self.metrics.dead_lettered, 1);
        error!(
            entry = %entry,
            attempts = entry.attempts(),
            "Dropped after exhausting retries"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_counts_entries() {
        let metrics = Arc::new(SyncMetrics::new());
        let sink = LogDeadLetterSink::new(metrics.clone());

        sink.record(DeadLetter::Document { id: 7, attempts: 4 }).await;
        sink.record(DeadLetter::Event {
            event: ChangeEvent::new("car_brand", 3),
            attempts: 4,
        })
        .await;

        assert_eq!(metrics.snapshot().dead_lettered, 2);
    }

    #[test]
    fn test_display() {
        let entry = DeadLetter::Event {
            event: ChangeEvent::new("car_series", 10),
            attempts: 4,
        };
        assert_eq!(entry.to_string(), "event car_series#10");
        assert_eq!(entry.attempts(), 4);
    }
}
