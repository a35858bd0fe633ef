//! Change event types for the CDC stream.
//!
//! A change event only names the row that changed. The indexer never trusts the
//! row image carried by the stream: it always re-reads the current state from the
//! catalog, which is why duplicate events carry no extra information.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tables of the car catalog that feed the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    /// `car_model`: the indexable unit. One row is one document.
    Model,
    /// `car_series`: parent of models.
    Series,
    /// `car_brand`: parent of series.
    Brand,
}

impl SourceTable {
    /// The physical table name in the catalog database.
    pub fn table_name(&self) -> &'static str {
        match self {
            SourceTable::Model => "car_model",
            SourceTable::Series => "car_series",
            SourceTable::Brand => "car_brand",
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A table name that does not belong to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown source table: {0}")]
pub struct UnknownTable(pub String);

impl FromStr for SourceTable {
    type Err = UnknownTable;

    /// Parse a table name.
    ///
    /// Accepts the physical name (`car_model`), a schema-qualified name
    /// (`car.car_model`) and the short aliases (`model`, `series`, `brand`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.rsplit('.').next().unwrap_or(s).trim();
        match name.to_ascii_lowercase().as_str() {
            "car_model" | "model" => Ok(SourceTable::Model),
            "car_series" | "series" => Ok(SourceTable::Series),
            "car_brand" | "brand" => Ok(SourceTable::Brand),
            _ => Err(UnknownTable(s.to_string())),
        }
    }
}

/// The operation recorded by the change stream.
///
/// Decoded for logging only. Whether a document is upserted or deleted is decided by
/// looking the row up in the catalog, not by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOperation {
    /// Row inserted.
    Create,
    /// Row updated.
    Update,
    /// Row deleted.
    Delete,
    /// Row emitted by an initial snapshot.
    Read,
}

/// A raw change event: which row of which table changed.
///
/// The table is kept as the raw name so that unknown tables reach the resolver,
/// which reports them instead of the decoder silently dropping them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub source_table: String,
    pub row_id: i64,
}

impl ChangeEvent {
    /// Create a new change event.
    pub fn new(source_table: impl Into<String>, row_id: i64) -> Self {
        Self {
            source_table: source_table.into(),
            row_id,
        }
    }

    /// Classify the source table of this event.
    pub fn table(&self) -> Result<SourceTable, UnknownTable> {
        self.source_table.parse()
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.source_table, self.row_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_physical_names() {
        assert_eq!("car_model".parse::<SourceTable>(), Ok(SourceTable::Model));
        assert_eq!("car_series".parse::<SourceTable>(), Ok(SourceTable::Series));
        assert_eq!("car_brand".parse::<SourceTable>(), Ok(SourceTable::Brand));
    }

    #[test]
    fn test_parse_aliases_and_qualified_names() {
        assert_eq!("model".parse::<SourceTable>(), Ok(SourceTable::Model));
        assert_eq!("Brand".parse::<SourceTable>(), Ok(SourceTable::Brand));
        assert_eq!("car.car_series".parse::<SourceTable>(), Ok(SourceTable::Series));
    }

    #[test]
    fn test_parse_unknown_table() {
        let err = "car_dealer".parse::<SourceTable>().unwrap_err();
        assert_eq!(err, UnknownTable("car_dealer".to_string()));
        assert_eq!(err.to_string(), "Unknown source table: car_dealer");
    }

    #[test]
    fn test_duplicate_events_collapse() {
        let mut pending = HashSet::new();
        pending.insert(ChangeEvent::new("model", 7));
        pending.insert(ChangeEvent::new("model", 7));
        pending.insert(ChangeEvent::new("brand", 7));

        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_event_table() {
        assert_eq!(ChangeEvent::new("car_brand", 3).table(), Ok(SourceTable::Brand));
        assert!(ChangeEvent::new("user", 3).table().is_err());
        assert_eq!(ChangeEvent::new("car_brand", 3).to_string(), "car_brand#3");
    }
}
