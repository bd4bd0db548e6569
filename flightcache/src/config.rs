//! Configuration for a [`FlightCache`](crate::cache::FlightCache).
//!
//! Configuration is fixed when the cache is opened. It names the backing log
//! file, the number of records kept in memory, and how evicted records reach
//! the file.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use flightcache::config::{CacheConfig, PersistMode, WriteBehindConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CacheConfig::new("ascent.txt")
//!     .with_capacity(50)
//!     .with_persist_mode(PersistMode::WriteBehind(WriteBehindConfig {
//!         queue_depth: 128,
//!         max_retries: 5,
//!         retry_backoff: Duration::from_millis(20),
//!     }));
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default backing log file.
pub const DEFAULT_STORE_PATH: &str = "rocket_data.txt";

/// Default number of records held in memory.
pub const DEFAULT_CAPACITY: usize = 20;

/// Largest accepted `max_retries`.
pub const MAX_RETRIES: u32 = 16;

/// Largest accepted `retry_backoff`, and the cap on the doubled backoff.
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Construction parameters for a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path of the append-only log that receives evicted records.
    pub store_path: PathBuf,

    /// Maximum number of records held in memory.
    pub capacity: usize,

    /// How evicted records are written to the log.
    pub persist_mode: PersistMode,
}

/// How evicted records reach the log file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    /// Each evicted record is appended and synced before the insert returns.
    #[default]
    Direct,

    /// Evicted records are queued to a dedicated writer thread.
    WriteBehind(WriteBehindConfig),
}

/// Tuning for the write-behind writer thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteBehindConfig {
    /// Records that may be queued before inserts block.
    pub queue_depth: usize,

    /// Retries per record after the first failed append.
    pub max_retries: u32,

    /// Initial backoff between retries (doubles each attempt).
    pub retry_backoff: Duration,
}

impl Default for WriteBehindConfig {
    /// Defaults: 64 queued records, 3 retries, 50ms initial backoff.
    fn default() -> Self {
        Self {
            queue_depth: 64,
            max_retries: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

impl WriteBehindConfig {
    /// Validates the queue depth and retry policy.
    ///
    /// # Errors
    ///
    /// See [`CacheConfig::validate`].
    pub fn validate(&self) -> Result<()> {
        if self.queue_depth == 0 {
            return Err(ConfigError::InvalidQueueDepth {
                depth: self.queue_depth,
            }
            .into());
        }

        if self.max_retries > MAX_RETRIES {
            return Err(ConfigError::InvalidRetries {
                max_retries: self.max_retries,
                limit: MAX_RETRIES,
            }
            .into());
        }

        if self.retry_backoff > MAX_RETRY_BACKOFF {
            return Err(ConfigError::InvalidBackoff {
                backoff: self.retry_backoff,
                limit: MAX_RETRY_BACKOFF,
            }
            .into());
        }

        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            capacity: DEFAULT_CAPACITY,
            persist_mode: PersistMode::Direct,
        }
    }
}

impl CacheConfig {
    /// Creates a config for the given log path with default capacity and
    /// direct persistence.
    pub fn new<P: AsRef<Path>>(store_path: P) -> Self {
        Self {
            store_path: store_path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Sets the in-memory capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the persistence mode.
    #[must_use]
    pub fn with_persist_mode(mut self, persist_mode: PersistMode) -> Self {
        self.persist_mode = persist_mode;
        self
    }

    /// Loads a config from a JSON file.
    ///
    /// Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON, or any error from
    /// [`validate`](Self::validate).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&data).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`] for a zero capacity,
    /// [`ConfigError::InvalidQueueDepth`] for a zero write-behind queue, and
    /// [`ConfigError::InvalidRetries`] or [`ConfigError::InvalidBackoff`] when
    /// the retry policy exceeds [`MAX_RETRIES`] or [`MAX_RETRY_BACKOFF`].
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                capacity: self.capacity,
            }
            .into());
        }

        if let PersistMode::WriteBehind(write_behind) = &self.persist_mode {
            write_behind.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlightCacheError;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.store_path, PathBuf::from("rocket_data.txt"));
        assert_eq!(config.capacity, 20);
        assert_eq!(config.persist_mode, PersistMode::Direct);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_invalid() {
        let config = CacheConfig::new("log.txt").with_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(FlightCacheError::Config(ConfigError::InvalidCapacity { capacity: 0 }))
        ));
    }

    #[test]
    fn test_zero_queue_depth_invalid() {
        let config = CacheConfig::new("log.txt").with_persist_mode(PersistMode::WriteBehind(
            WriteBehindConfig {
                queue_depth: 0,
                ..WriteBehindConfig::default()
            },
        ));
        assert!(matches!(
            config.validate(),
            Err(FlightCacheError::Config(ConfigError::InvalidQueueDepth { depth: 0 }))
        ));
    }

    #[test]
    fn test_load_partial_json() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(&path, r#"{ "capacity": 5, "store_path": "telemetry.txt" }"#).unwrap();

        let config = CacheConfig::load(&path).unwrap();
        assert_eq!(config.capacity, 5);
        assert_eq!(config.store_path, PathBuf::from("telemetry.txt"));
        assert_eq!(config.persist_mode, PersistMode::Direct);
    }

    #[test]
    fn test_load_write_behind_json() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{ "persist_mode": { "write_behind": { "queue_depth": 8 } } }"#,
        )
        .unwrap();

        let config = CacheConfig::load(&path).unwrap();
        assert_eq!(
            config.persist_mode,
            PersistMode::WriteBehind(WriteBehindConfig {
                queue_depth: 8,
                ..WriteBehindConfig::default()
            })
        );
    }

    #[test]
    fn test_load_round_trips_serialized_config() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("cache.json");
        let original = CacheConfig::new("a.txt")
            .with_capacity(7)
            .with_persist_mode(PersistMode::WriteBehind(WriteBehindConfig::default()));
        std::fs::write(&path, serde_json::to_string_pretty(&original).unwrap()).unwrap();

        assert_eq!(CacheConfig::load(&path).unwrap(), original);
    }

    #[test]
    fn test_load_errors() {
        let temp_dir = tempdir().unwrap();

        let missing = temp_dir.path().join("missing.json");
        assert!(matches!(
            CacheConfig::load(&missing),
            Err(FlightCacheError::Config(ConfigError::Load { .. }))
        ));

        let garbage = temp_dir.path().join("garbage.json");
        std::fs::write(&garbage, "capacity = 5").unwrap();
        assert!(matches!(
            CacheConfig::load(&garbage),
            Err(FlightCacheError::Config(ConfigError::Parse { .. }))
        ));

        let zero = temp_dir.path().join("zero.json");
        std::fs::write(&zero, r#"{ "capacity": 0 }"#).unwrap();
        assert!(matches!(
            CacheConfig::load(&zero),
            Err(FlightCacheError::Config(ConfigError::InvalidCapacity { .. }))
        ));
    }

    #[test]
    fn test_retry_policy_bounds() {
        let within = WriteBehindConfig {
            max_retries: MAX_RETRIES,
            retry_backoff: MAX_RETRY_BACKOFF,
            ..WriteBehindConfig::default()
        };
        assert!(within.validate().is_ok());

        let too_many = WriteBehindConfig {
            max_retries: MAX_RETRIES + 1,
            ..WriteBehindConfig::default()
        };
        assert!(matches!(
            CacheConfig::default()
                .with_persist_mode(PersistMode::WriteBehind(too_many))
                .validate(),
            Err(FlightCacheError::Config(ConfigError::InvalidRetries { .. }))
        ));

        let too_slow = WriteBehindConfig {
            retry_backoff: Duration::from_secs(3600),
            ..WriteBehindConfig::default()
        };
        assert!(matches!(
            too_slow.validate(),
            Err(FlightCacheError::Config(ConfigError::InvalidBackoff { .. }))
        ));
    }

    #[test]
    fn test_load_rejects_huge_backoff() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{ "persist_mode": { "write_behind": { "retry_backoff": { "secs": 18446744073709551615, "nanos": 0 } } } }"#,
        )
        .unwrap();

        assert!(matches!(
            CacheConfig::load(&path),
            Err(FlightCacheError::Config(ConfigError::InvalidBackoff { .. }))
        ));
    }
}
