//! Configuration and dependency initialization.

mod dependencies;
mod sync_config;

pub use dependencies::{ConnectionMode, Dependencies, IndexerSettings};
pub use sync_config::SyncConfig;
