//! Debezium change record decoding.
//!
//! Debezium's JSON converter writes either a schema envelope
//! (`{"schema": {...}, "payload": {...}}`) or, with schemas disabled, the bare payload.
//! Only the operation, the source table and the `id` column of the row image are read.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::IngestError;
use catalog_indexer_shared::{ChangeEvent, ChangeOperation};

/// Name of the primary key column in every catalog table.
const ID_FIELD: &str = "id";

/// A decoded change record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// The operation reported by Debezium. Logged, never trusted.
    pub operation: ChangeOperation,
    /// The changed row.
    pub event: ChangeEvent,
}

#[derive(Debug, Deserialize)]
struct DebeziumPayload {
    op: String,
    #[serde(default)]
    before: Option<Value>,
    #[serde(default)]
    after: Option<Value>,
    #[serde(default)]
    source: Option<DebeziumSource>,
}

#[derive(Debug, Deserialize)]
struct DebeziumSource {
    #[serde(default)]
    table: Option<String>,
}

/// Map a Debezium `op` code to a [`ChangeOperation`].
pub fn parse_operation(code: &str) -> Result<ChangeOperation, IngestError> {
    match code {
        "c" => Ok(ChangeOperation::Create),
        "u" => Ok(ChangeOperation::Update),
        "d" => Ok(ChangeOperation::Delete),
        "r" => Ok(ChangeOperation::Read),
        other => Err(IngestError::parse(format!("Unknown Debezium op code: {}", other))),
    }
}

/// Decode the value of a change record.
///
/// # Arguments
///
/// * `topic` - Topic the record was read from; its last segment names the table when the
///   payload carries no `source.table`
/// * `value` - Raw record value, `None` for tombstones
///
/// # Returns
///
/// * `Ok(Some(ChangeRecord))` - A row change
/// * `Ok(None)` - Tombstone, or a record without a usable row image
/// * `Err(IngestError)` - The record is not a valid Debezium change record
pub fn decode_change_record(
    topic: &str,
    value: Option<&[u8]>,
) -> Result<Option<ChangeRecord>, IngestError> {
    let bytes = match value {
        Some(b) if !b.is_empty() => b,
        _ => return Ok(None),
    };

    let root: Value = serde_json::from_slice(bytes)
        .map_err(|e| IngestError::parse(format!("Invalid JSON: {}", e)))?;

    let payload = match root.get("payload") {
        Some(Value::Null) => return Ok(None),
        Some(inner) if inner.is_object() => inner.clone(),
        _ => root,
    };

    let payload: DebeziumPayload = serde_json::from_value(payload)
        .map_err(|e| IngestError::parse(format!("Invalid Debezium payload: {}", e)))?;

    let operation = parse_operation(&payload.op)?;

    let image = match operation {
        ChangeOperation::Delete => payload.before.as_ref(),
        _ => payload
            .after
            .as_ref()
            .filter(|v| !v.is_null())
            .or(payload.before.as_ref()),
    };
    let row_id = match image.and_then(row_id) {
        Some(id) => id,
        None => return Ok(None),
    };

    let table = payload
        .source
        .and_then(|s| s.table)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| table_from_topic(topic).to_string());

    Ok(Some(ChangeRecord {
        operation,
        event: ChangeEvent::new(table, row_id),
    }))
}

/// The last dot-separated segment of a topic (`cdc.car.car_model` -> `car_model`).
pub fn table_from_topic(topic: &str) -> &str {
    topic.rsplit('.').next().unwrap_or(topic)
}

/// Read the primary key from a row image. Numeric strings are accepted.
fn row_id(image: &Value) -> Option<i64> {
    match image.get(ID_FIELD)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
