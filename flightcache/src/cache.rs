//! The bounded telemetry cache.
//!
//! [`FlightCache`] ties the other modules together. It keeps the newest
//! `capacity` records in a [`RecordRing`], hands the oldest record to the
//! backing [`LogFile`] whenever an insertion would overflow, answers
//! analytics over what it currently holds, and can rebuild itself from the
//! log.
//!
//! # Eviction
//!
//! ```text
//! add_data_point ──► ring full? ──no──────────────────────────► push newest
//!                        │
//!                       yes ──► persist oldest ──ok──► drop oldest ──► push newest
//!                                     │
//!                                    err ──► return error, cache unchanged
//! ```
//!
//! In [`PersistMode::Direct`] "persist" means append and sync; a failure is
//! returned to the caller and nothing is removed. In
//! [`PersistMode::WriteBehind`] "persist" means enqueue to the writer thread;
//! write failures are reported later by [`FlightCache::flush`].
//!
//! # Reloading
//!
//! [`FlightCache::load_all`] replaces the contents with the newest
//! `capacity` records found in the log. Older records in the file are skipped
//! rather than evicted, so a reload never writes anything back to the log,
//! and the scan holds at most `capacity` records at a time.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use flightcache::{CacheConfig, FlightCache, LogRecord};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut cache = FlightCache::open(CacheConfig::new("rocket_data.txt").with_capacity(20))?;
//!
//! cache.add_data_point(LogRecord {
//!     timestamp: 1.0,
//!     latitude: 28.5,
//!     longitude: -80.6,
//!     altitude: 120.0,
//!     velocity: 85.0,
//!     ..LogRecord::default()
//! })?;
//!
//! println!("max altitude: {} m", cache.max_altitude());
//! println!("distance: {} m", cache.total_distance());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use crate::analytics::{self, FlightSummary};
use crate::config::{CacheConfig, PersistMode};
use crate::error::{RecordError, Result};
use crate::persist::{LineDiagnostic, LogFile};
use crate::record::LogRecord;
use crate::ring::{RecordRing, RingIterator};
use crate::writer::WriteBehind;

/// Result of rebuilding the cache from its log.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Well-formed lines found in the log.
    pub parsed: usize,
    /// Records held by the cache after the reload.
    pub retained: usize,
    /// Malformed lines that were skipped, in file order.
    pub diagnostics: Vec<LineDiagnostic>,
}

impl LoadReport {
    /// Number of malformed lines that were skipped.
    pub fn skipped(&self) -> usize {
        self.diagnostics.len()
    }
}

/// A fixed-capacity, insertion-ordered cache of telemetry records.
///
/// # Thread Safety
///
/// The cache is designed for single-threaded access. Every mutation takes
/// `&mut self`; callers sharing a cache across threads must wrap it, e.g. in
/// `Arc<Mutex<FlightCache>>`.
#[derive(Debug)]
pub struct FlightCache {
    /// Configuration the cache was opened with.
    config: CacheConfig,
    /// Backing log for eviction, `save_all` and `load_all`.
    log: LogFile,
    /// In-memory records, oldest first.
    ring: RecordRing,
    /// Writer thread, present in write-behind mode.
    writer: Option<WriteBehind>,
}

impl FlightCache {
    /// Opens a cache with the given configuration.
    ///
    /// The cache starts empty and the log file is not touched; call
    /// [`load_all`](Self::load_all) to rebuild from an existing log.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`](crate::error::ConfigError) if the
    /// configuration is invalid, or
    /// [`PersistError::WriterUnavailable`](crate::error::PersistError::WriterUnavailable)
    /// if the write-behind thread cannot be started.
    pub fn open(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let log = LogFile::new(&config.store_path);
        let ring = RecordRing::new(config.capacity)?;
        let writer = match config.persist_mode {
            PersistMode::Direct => None,
            PersistMode::WriteBehind(write_behind) => {
                Some(WriteBehind::spawn(log.clone(), write_behind)?)
            }
        };

        tracing::debug!(
            "opened cache on '{}' (capacity {}, {:?})",
            config.store_path.display(),
            config.capacity,
            config.persist_mode
        );

        Ok(Self {
            config,
            log,
            ring,
            writer,
        })
    }

    /// Inserts a record at the newest end, evicting the oldest if full.
    ///
    /// # Errors
    ///
    /// - [`RecordError::NonFinite`] if any field is NaN or infinite; nothing
    ///   changes.
    /// - A [`PersistError`](crate::error::PersistError) if the evicted record
    ///   cannot be appended (direct mode) or queued (write-behind mode). The
    ///   oldest record stays in the cache and `record` is not inserted.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use flightcache::{CacheConfig, FlightCache, LogRecord};
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut cache = FlightCache::open(CacheConfig::default().with_capacity(2))?;
    /// for t in 0..3 {
    ///     cache.add_data_point(LogRecord { timestamp: f64::from(t), ..LogRecord::default() })?;
    /// }
    /// // The record at t=0 is now in rocket_data.txt.
    /// assert_eq!(cache.len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_data_point(&mut self, record: LogRecord) -> Result<()> {
        if let Some((field, value)) = record.first_non_finite() {
            return Err(RecordError::NonFinite { field, value }.into());
        }

        if self.ring.is_full()
            && let Some(oldest) = self.ring.oldest().copied()
        {
            self.persist_evicted(oldest)?;
            self.ring.pop_oldest();
            tracing::debug!("evicted record at t={}", oldest.timestamp);
        }

        let displaced = self.ring.push(record);
        debug_assert!(displaced.is_none(), "ring displaced a record without persisting it");
        Ok(())
    }

    fn persist_evicted(&self, record: LogRecord) -> Result<()> {
        match &self.writer {
            Some(writer) => writer.enqueue(record),
            None => self.log.append(&record),
        }
    }

    /// Returns the newest record, or `None` if the cache is empty.
    pub fn latest_data(&self) -> Option<&LogRecord> {
        self.ring.newest()
    }

    /// Returns up to `n` records, newest first.
    pub fn last_n_readings(&self, n: usize) -> Vec<LogRecord> {
        self.ring.iter().rev().take(n).copied().collect()
    }

    /// Discards every cached record without writing any of them.
    pub fn clear_cache(&mut self) {
        self.ring.clear();
    }

    /// Mean velocity of the cached records, or `0.0` if empty.
    pub fn average_velocity(&self) -> f64 {
        analytics::average_velocity(&self.ring)
    }

    /// Highest altitude among the cached records, or `0.0` if empty.
    pub fn max_altitude(&self) -> f64 {
        analytics::max_altitude(&self.ring)
    }

    /// Ground distance covered by the cached records, oldest to newest.
    pub fn total_distance(&self) -> f64 {
        analytics::total_distance(&self.ring)
    }

    /// Summarizes every cached record.
    pub fn summary(&self) -> FlightSummary {
        FlightSummary::over(&self.ring)
    }

    /// Summarizes the newest `n` cached records.
    pub fn summary_last(&self, n: usize) -> FlightSummary {
        let skip = self.ring.len().saturating_sub(n);
        FlightSummary::over(self.ring.iter().skip(skip))
    }

    /// Appends every cached record to the log, oldest first.
    ///
    /// The cache keeps its contents, so a saved record that is evicted later
    /// is appended a second time and the log then holds it twice. In
    /// write-behind mode the queue is flushed first so the file stays in
    /// insertion order. Returns the number of records written.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`](crate::error::PersistError) if the log
    /// cannot be written or a queued eviction failed.
    pub fn save_all(&self) -> Result<usize> {
        self.flush()?;
        let written = self.log.append_all(&self.ring)?;
        tracing::debug!(
            "saved {written} cached record(s) to '{}'",
            self.log.path().display()
        );
        Ok(written)
    }

    /// Rebuilds the cache from the log.
    ///
    /// The log is streamed line by line into a fresh ring of the same
    /// capacity, so memory use stays bounded by `capacity` however long the
    /// log is. Malformed lines are skipped and reported in the returned
    /// [`LoadReport`]. On success the cache holds the newest `capacity`
    /// well-formed records; older ones stay in the file only. Nothing is
    /// written to the log.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`](crate::error::PersistError) if the log
    /// cannot be opened or read, or if a queued eviction failed. The cache is
    /// left unchanged in that case.
    pub fn load_all(&mut self) -> Result<LoadReport> {
        self.flush()?;

        let mut rebuilt = RecordRing::new(self.ring.capacity())?;
        let scan = self.log.read_each(|record| {
            rebuilt.push(record);
        })?;
        self.ring = rebuilt;

        let report = LoadReport {
            parsed: scan.parsed,
            retained: self.ring.len(),
            diagnostics: scan.diagnostics,
        };
        tracing::debug!(
            "loaded '{}': {} parsed, {} retained, {} skipped",
            self.log.path().display(),
            report.parsed,
            report.retained,
            report.skipped()
        );
        Ok(report)
    }

    /// Waits for queued evictions to reach the log.
    ///
    /// A no-op in direct mode, where every eviction is synced before
    /// `add_data_point` returns.
    ///
    /// # Errors
    ///
    /// Returns
    /// [`PersistError::RecordsNotPersisted`](crate::error::PersistError::RecordsNotPersisted)
    /// while the writer holds records it could not write; recover them with
    /// [`take_failed`](Self::take_failed).
    pub fn flush(&self) -> Result<()> {
        match &self.writer {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    /// Returns evicted records the write-behind writer could not persist.
    ///
    /// Always empty in direct mode.
    pub fn take_failed(&self) -> Vec<LogRecord> {
        self.writer
            .as_ref()
            .map(WriteBehind::take_failed)
            .unwrap_or_default()
    }

    /// Stops the write-behind writer after draining its queue.
    ///
    /// Dropping the cache does the same but cannot report errors.
    ///
    /// # Errors
    ///
    /// Returns
    /// [`PersistError::RecordsNotPersisted`](crate::error::PersistError::RecordsNotPersisted)
    /// if any evicted record was never written.
    pub fn shutdown(mut self) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.shutdown(),
            None => Ok(()),
        }
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Whether the cache holds no records.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Maximum number of cached records.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Iterates over cached records, oldest first.
    pub fn iter(&self) -> RingIterator<'_> {
        self.ring.iter()
    }

    /// Path of the backing log.
    pub fn path(&self) -> &Path {
        self.log.path()
    }

    /// Configuration the cache was opened with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
