//! Tuning of the sync pipeline, read from `SYNC_*` environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::buffer::BufferConfig;
use crate::loader::LoaderConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::resync::DEFAULT_RESYNC_BATCH_SIZE;
use crate::IndexingError;

/// Default buffer size that triggers a flush.
const DEFAULT_SOFT_LIMIT: usize = 1000;

/// Default buffer size that pauses intake.
const DEFAULT_HARD_LIMIT: usize = 5000;

/// Default maximum time between flushes of a non-empty buffer, in milliseconds.
const DEFAULT_MAX_WAIT_MS: u64 = 2000;

/// Default interval of the idle flush check, in milliseconds.
const DEFAULT_FLUSH_TICK_MS: u64 = 500;

/// Default number of IDs per catalog query.
const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default number of failures before an ID is dead-lettered.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default number of operations per bulk request.
const DEFAULT_BULK_BATCH_SIZE: usize = 1000;

/// Tuning of the sync pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub soft_limit: usize,
    pub hard_limit: usize,
    pub max_wait: Duration,
    pub flush_tick: Duration,
    pub chunk_size: usize,
    pub max_retries: u32,
    pub bulk_batch_size: usize,
    pub resync_batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            soft_limit: DEFAULT_SOFT_LIMIT,
            hard_limit: DEFAULT_HARD_LIMIT,
            max_wait: Duration::from_millis(DEFAULT_MAX_WAIT_MS),
            flush_tick: Duration::from_millis(DEFAULT_FLUSH_TICK_MS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            bulk_batch_size: DEFAULT_BULK_BATCH_SIZE,
            resync_batch_size: DEFAULT_RESYNC_BATCH_SIZE,
        }
    }
}

impl SyncConfig {
    /// Read the configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `SYNC_SOFT_LIMIT`: Buffer size that triggers a flush (default: 1000)
    /// - `SYNC_HARD_LIMIT`: Buffer size that pauses intake (default: 5000)
    /// - `SYNC_MAX_WAIT_MS`: Maximum idle time of a non-empty buffer (default: 2000)
    /// - `SYNC_FLUSH_TICK_MS`: Idle check interval (default: 500)
    /// - `SYNC_CHUNK_SIZE`: IDs per catalog query (default: 500)
    /// - `SYNC_MAX_RETRIES`: Failures before dead-lettering (default: 3)
    /// - `BULK_BATCH_SIZE`: Operations per bulk request (default: 1000)
    /// - `RESYNC_BATCH_SIZE`: Models per resync batch (default: 100)
    ///
    /// Unparsable values fall back to their default with a warning.
    ///
    /// # Returns
    ///
    /// * `Ok(SyncConfig)` - A validated configuration
    /// * `Err(IndexingError)` - If the values are inconsistent
    pub fn from_env() -> Result<Self, IndexingError> {
        let config = Self {
            soft_limit: env_or("SYNC_SOFT_LIMIT", DEFAULT_SOFT_LIMIT),
            hard_limit: env_or("SYNC_HARD_LIMIT", DEFAULT_HARD_LIMIT),
            max_wait: Duration::from_millis(env_or("SYNC_MAX_WAIT_MS", DEFAULT_MAX_WAIT_MS)),
            flush_tick: Duration::from_millis(env_or("SYNC_FLUSH_TICK_MS", DEFAULT_FLUSH_TICK_MS)),
            chunk_size: env_or("SYNC_CHUNK_SIZE", DEFAULT_CHUNK_SIZE),
            max_retries: env_or("SYNC_MAX_RETRIES", DEFAULT_MAX_RETRIES),
            bulk_batch_size: env_or("BULK_BATCH_SIZE", DEFAULT_BULK_BATCH_SIZE),
            resync_batch_size: env_or("RESYNC_BATCH_SIZE", DEFAULT_RESYNC_BATCH_SIZE),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the values are usable together.
    pub fn validate(&self) -> Result<(), IndexingError> {
        if self.soft_limit == 0 {
            return Err(IndexingError::config("SYNC_SOFT_LIMIT must be positive"));
        }
        if self.soft_limit >= self.hard_limit {
            return Err(IndexingError::config(format!(
                "SYNC_SOFT_LIMIT ({}) must be lower than SYNC_HARD_LIMIT ({})",
                self.soft_limit, self.hard_limit
            )));
        }
        if self.flush_tick.is_zero() {
            return Err(IndexingError::config("SYNC_FLUSH_TICK_MS must be positive"));
        }
        if self.chunk_size == 0 || self.bulk_batch_size == 0 || self.resync_batch_size == 0 {
            return Err(IndexingError::config(
                "SYNC_CHUNK_SIZE, BULK_BATCH_SIZE and RESYNC_BATCH_SIZE must be positive",
            ));
        }
        Ok(())
    }

    pub fn buffer_config(&self) -> BufferConfig {
        BufferConfig {
            soft_limit: self.soft_limit,
            hard_limit: self.hard_limit,
            max_retries: self.max_retries,
        }
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size: self.bulk_batch_size,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            flush_tick: self.flush_tick,
            max_wait: self.max_wait,
            ..OrchestratorConfig::default()
        }
    }
}

/// Read and parse an environment variable, falling back to `default`.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(key, env::var(key).ok(), default)
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key = key, value = %value, "Invalid value, using default");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_config(), BufferConfig::default());
        assert_eq!(config.loader_config().batch_size, 1000);
        assert_eq!(config.resync_batch_size, 100);
    }

    #[test]
    fn test_soft_limit_must_be_below_hard_limit() {
        let config = SyncConfig {
            soft_limit: 5000,
            hard_limit: 5000,
            ..SyncConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(IndexingError::ConfigError(_))
        ));
    }

    #[test]
    fn test_zero_sizes_are_rejected() {
        let config = SyncConfig {
            chunk_size: 0,
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_or() {
        assert_eq!(parse_or("SYNC_SOFT_LIMIT", Some("250".to_string()), 1000usize), 250);
        assert_eq!(parse_or("SYNC_SOFT_LIMIT", Some(" 12 ".to_string()), 1000usize), 12);
        assert_eq!(parse_or("SYNC_SOFT_LIMIT", Some("lots".to_string()), 1000usize), 1000);
        assert_eq!(parse_or::<u32>("SYNC_MAX_RETRIES", None, 3), 3);
    }

    #[test]
    fn test_orchestrator_config() {
        let config = SyncConfig {
            max_wait: Duration::from_secs(5),
            ..SyncConfig::default()
        };
        let orchestrator = config.orchestrator_config();
        assert_eq!(orchestrator.max_wait, Duration::from_secs(5));
        assert_eq!(orchestrator.flush_tick, Duration::from_millis(500));
    }
}
