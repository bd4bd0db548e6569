//! Error types for the flightcache telemetry cache.

use thiserror::Error;

/// The main error type for all flightcache operations.
///
/// Each variant wraps the error enum of one concern: decoding stored lines,
/// talking to the backing file, validating incoming samples, and loading
/// configuration.
#[derive(Error, Debug)]
pub enum FlightCacheError {
    /// A stored line could not be decoded.
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// The backing log file could not be opened, read, or written.
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),

    /// A sample was rejected on insertion.
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// The cache configuration is invalid or could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors produced when decoding a line of the persisted log.
///
/// Decoding is all-or-nothing, so any of these means no record was produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The line did not split into exactly nine comma-separated fields.
    #[error("expected 9 comma-separated fields, found {found}")]
    FieldCount {
        /// Number of fields actually present.
        found: usize,
    },

    /// A field is not a decimal number.
    #[error("field '{field}' is not a number: {text:?}")]
    InvalidNumber {
        /// Name of the offending field.
        field: &'static str,
        /// The raw field text.
        text: String,
    },

    /// The line is not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    /// A field parsed, but to NaN or an infinity.
    #[error("field '{field}' is not finite: {text:?}")]
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
        /// The raw field text.
        text: String,
    },
}

/// Errors that can occur while accessing the backing log file.
#[derive(Error, Debug)]
pub enum PersistError {
    /// The log file could not be opened.
    #[error("failed to open log file '{path}': {source}")]
    Open {
        /// The log file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing a line to the log file failed.
    #[error("failed to write to log file '{path}': {source}")]
    Write {
        /// The log file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Syncing the log file to disk failed.
    #[error("failed to sync log file '{path}' to disk: {source}")]
    Sync {
        /// The log file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the log file failed part way through.
    #[error("failed to read log file '{path}' at line {line}: {source}")]
    Read {
        /// The log file path.
        path: String,
        /// The 1-based line number being read when the error occurred.
        line: usize,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The write-behind thread has exited and can no longer accept records.
    #[error("write-behind writer for '{path}' is no longer running")]
    WriterUnavailable {
        /// The log file path the writer was serving.
        path: String,
    },

    /// The write-behind thread gave up on some evicted records.
    ///
    /// The records are retained by the writer; retrieve them with
    /// [`FlightCache::take_failed`](crate::cache::FlightCache::take_failed).
    #[error("{count} evicted record(s) could not be persisted to '{path}'")]
    RecordsNotPersisted {
        /// The log file path.
        path: String,
        /// Number of records that were not written.
        count: usize,
    },
}

/// Errors that can occur when inserting a sample into the cache.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// The sample has a NaN or infinite field and could never be read back.
    #[error("field '{field}' is not finite: {value}")]
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// Errors that can occur while validating or loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Capacity must hold at least one record.
    #[error("invalid capacity: {capacity} (must be > 0)")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },

    /// The write-behind queue must hold at least one record.
    #[error("invalid write-behind queue depth: {depth} (must be > 0)")]
    InvalidQueueDepth {
        /// The rejected depth.
        depth: usize,
    },

    /// Write-behind retry count above the supported limit.
    #[error("invalid write-behind max_retries: {max_retries} (must be <= {limit})")]
    InvalidRetries {
        /// The rejected retry count.
        max_retries: u32,
        /// The largest accepted value.
        limit: u32,
    },

    /// Write-behind initial backoff above the supported limit.
    #[error("invalid write-behind retry_backoff: {backoff:?} (must be <= {limit:?})")]
    InvalidBackoff {
        /// The rejected backoff.
        backoff: std::time::Duration,
        /// The largest accepted value.
        limit: std::time::Duration,
    },

    /// The configuration file could not be read.
    #[error("failed to read config '{path}': {source}")]
    Load {
        /// The config file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`CacheConfig`](crate::config::CacheConfig).
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        /// The config file path.
        path: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Type alias for `Result<T, FlightCacheError>`.
pub type Result<T> = std::result::Result<T, FlightCacheError>;
