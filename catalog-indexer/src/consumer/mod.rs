//! Consumer module for the catalog indexer.
//!
//! Defines the [`ChangeSource`] contract the pipeline consumes and its Kafka
//! implementation reading Debezium change records.

mod kafka_consumer;
mod messages;

use std::collections::BTreeMap;

use async_trait::async_trait;
use catalog_indexer_shared::ChangeEvent;

use crate::errors::IngestError;

pub use kafka_consumer::KafkaConsumer;
pub use messages::{decode_change_record, parse_operation, table_from_topic, ChangeRecord};

/// Position of a record in the partitioned change log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl SourcePosition {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

/// One record read from the change source.
///
/// `events` is empty for tombstones and undecodable records: their position still has
/// to be committed.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub position: SourcePosition,
    pub events: Vec<ChangeEvent>,
}

/// Highest consumed offset per (topic, partition).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetMap {
    offsets: BTreeMap<(String, i32), i64>,
}

impl OffsetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a consumed position. Older offsets never replace newer ones.
    pub fn record(&mut self, position: &SourcePosition) {
        self.observe(position.topic.clone(), position.partition, position.offset);
    }

    /// Fold another map into this one, keeping the maximum offset per partition.
    pub fn merge(&mut self, other: OffsetMap) {
        for ((topic, partition), offset) in other.offsets {
            self.observe(topic, partition, offset);
        }
    }

    fn observe(&mut self, topic: String, partition: i32, offset: i64) {
        self.offsets
            .entry((topic, partition))
            .and_modify(|current| *current = (*current).max(offset))
            .or_insert(offset);
    }

    /// Highest consumed offset of a partition.
    pub fn get(&self, topic: &str, partition: i32) -> Option<i64> {
        self.offsets.get(&(topic.to_string(), partition)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Iterate as `(topic, partition, offset)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32, i64)> {
        self.offsets
            .iter()
            .map(|((topic, partition), offset)| (topic.as_str(), *partition, *offset))
    }
}

/// A partitioned, replayable stream of change records.
///
/// Implementations must support pausing intake for backpressure and committing the
/// consumed positions so that a restart resumes after them.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Subscribe to the configured topics.
    fn subscribe(&self) -> Result<(), IngestError>;

    /// Wait for the next record.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(SourceRecord))` - The next record, possibly without events
    /// * `Ok(None)` - The stream has ended
    /// * `Err(IngestError)` - A transport error; the caller may keep reading
    async fn next_record(&self) -> Result<Option<SourceRecord>, IngestError>;

    /// Stop fetching new records until [`ChangeSource::resume`] is called.
    fn pause(&self) -> Result<(), IngestError>;

    /// Resume fetching after a pause.
    fn resume(&self) -> Result<(), IngestError>;

    /// Commit the given positions. Each committed position is the next offset to read,
    /// i.e. the consumed offset plus one.
    async fn commit(&self, offsets: &OffsetMap) -> Result<(), IngestError>;
}
