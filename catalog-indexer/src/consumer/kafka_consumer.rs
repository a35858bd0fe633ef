//! Kafka consumer implementation of the change source.
//!
//! Reads Debezium change records from the CDC topics with manual offset commits.

use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::{BorrowedMessage, Message as KafkaMessage},
    Offset, TopicPartitionList,
};
use tracing::{debug, error, info, instrument};

use crate::consumer::messages::decode_change_record;
use crate::consumer::{ChangeSource, OffsetMap, SourcePosition, SourceRecord};
use crate::errors::IngestError;

/// Kafka consumer for Debezium change records.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topics: Vec<String>,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    ///
    /// Auto-commit is disabled: offsets are committed by the sync buffer once the
    /// events they carry have been flushed.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID
    /// * `topics` - CDC topics to subscribe to
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaConsumer)` - A new consumer instance
    /// * `Err(IngestError)` - If consumer creation fails
    pub fn new(brokers: &str, group_id: &str, topics: Vec<String>) -> Result<Self, IngestError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(
            brokers = %brokers,
            group_id = %group_id,
            topics = ?topics,
            "Created Kafka consumer"
        );

        Ok(Self { consumer, topics })
    }

    /// Decode a Kafka message into a source record.
    ///
    /// Undecodable messages are logged and returned without events so that their
    /// offset is still committed.
    fn to_record(&self, msg: &BorrowedMessage<'_>) -> SourceRecord {
        let position = SourcePosition::new(msg.topic(), msg.partition(), msg.offset());

        let events = match decode_change_record(msg.topic(), msg.payload()) {
            Ok(Some(record)) => {
                debug!(
                    topic = %position.topic,
                    partition = position.partition,
                    offset = position.offset,
                    operation = ?record.operation,
                    event = %record.event,
                    "Decoded change record"
                );
                vec![record.event]
            }
            Ok(None) => {
                debug!(
                    topic = %position.topic,
                    partition = position.partition,
                    offset = position.offset,
                    "Record carries no row change"
                );
                Vec::new()
            }
            Err(e) => {
                error!(
                    topic = %position.topic,
                    partition = position.partition,
                    offset = position.offset,
                    key = ?msg.key(),
                    error = %e,
                    "Failed to decode change record, skipping"
                );
                Vec::new()
            }
        };

        SourceRecord { position, events }
    }

    fn current_assignment(&self) -> Result<TopicPartitionList, IngestError> {
        Ok(self.consumer.assignment()?)
    }
}

#[async_trait]
impl ChangeSource for KafkaConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        let topics: Vec<&str> = self.topics.iter().map(|s| s.as_str()).collect();
        self.consumer
            .subscribe(&topics)
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(topics = ?self.topics, "Subscribed to Kafka topics");
        Ok(())
    }

    async fn next_record(&self) -> Result<Option<SourceRecord>, IngestError> {
        let msg = self.consumer.recv().await?;
        Ok(Some(self.to_record(&msg)))
    }

    fn pause(&self) -> Result<(), IngestError> {
        let assignment = self.current_assignment()?;
        self.consumer.pause(&assignment)?;
        info!(partitions = assignment.count(), "Paused Kafka consumption");
        Ok(())
    }

    fn resume(&self) -> Result<(), IngestError> {
        let assignment = self.current_assignment()?;
        self.consumer.resume(&assignment)?;
        info!(partitions = assignment.count(), "Resumed Kafka consumption");
        Ok(())
    }

    #[instrument(skip(self, offsets), fields(partitions = offsets.len()))]
    async fn commit(&self, offsets: &OffsetMap) -> Result<(), IngestError> {
        if offsets.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for (topic, partition, offset) in offsets.iter() {
            tpl.add_partition_offset(topic, partition, Offset::Offset(offset + 1))
                .map_err(|e| IngestError::kafka(e.to_string()))?;
        }

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        debug!("Committed offsets");
        Ok(())
    }
}
