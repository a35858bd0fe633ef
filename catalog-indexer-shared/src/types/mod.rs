//! This module defines the core data structures and types used across the catalog indexer.
//! It re-exports specific types like `ChangeEvent` and `IndexDocument`.

pub mod change_event;
pub mod index_document;
pub mod tag_value;

pub use change_event::{ChangeEvent, ChangeOperation, SourceTable, UnknownTable};
pub use index_document::{IndexDocument, ModelId};
pub use tag_value::TagValue;
