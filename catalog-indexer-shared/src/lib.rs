//! # Catalog Indexer Shared
//!
//! This crate defines shared data structures and types used across the catalog indexer.
//! It includes the change events read from the CDC stream, the denormalized documents
//! written to the search index, and the tag coercion used while assembling them.

pub mod types;

pub use types::change_event::{ChangeEvent, ChangeOperation, SourceTable, UnknownTable};
pub use types::index_document::{IndexDocument, ModelId};
pub use types::tag_value::TagValue;
