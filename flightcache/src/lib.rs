//! # flightcache
//!
//! Bounded in-memory flight telemetry cache with durable FIFO eviction.
//!
//! flightcache keeps the most recent telemetry samples from a flight computer
//! in a fixed-capacity ring. When a new sample would overflow it, the oldest
//! sample is appended to a plain-text log before it leaves memory. The cache
//! answers analytics over what it currently holds and can rebuild itself from
//! the log after a restart.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Fixed memory footprint: the ring is allocated once at open
//! - No record leaves memory before its write has succeeded (direct mode) or
//!   been queued (write-behind mode)
//! - Human-readable, append-only log with a fixed nine-column line format
//! - Malformed log lines are skipped and reported, never fatal
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flightcache::{CacheConfig, FlightCache, LogRecord};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut cache = FlightCache::open(CacheConfig::new("rocket_data.txt").with_capacity(20))?;
//!
//! // Feed samples from the sensor loop
//! for t in 0..25 {
//!     let t = f64::from(t);
//!     cache.add_data_point(LogRecord {
//!         timestamp: t,
//!         latitude: 28.5 + t * 1e-4,
//!         longitude: -80.6,
//!         altitude: t * t,
//!         velocity: 2.0 * t,
//!         ..LogRecord::default()
//!     })?;
//! }
//!
//! // The five oldest samples are now in rocket_data.txt
//! println!("latest: {:?}", cache.latest_data());
//! println!("avg velocity: {}", cache.average_velocity());
//!
//! // Rebuild after a restart
//! let report = cache.load_all()?;
//! println!("{} lines skipped", report.skipped());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`FlightCache`] — Top-level handle; owns the ring and the log
//! - [`LogRecord`] — One telemetry sample
//! - [`CacheConfig`] — Log path, capacity, and persistence mode
//! - [`FlightSummary`] — Analytics over a window of cached records
//!
//! ## Modules
//!
//! - [`cache`] — Insertion, eviction, reads, save and reload
//! - [`ring`] — Fixed-capacity ring buffer
//! - [`codec`] — Line format of the log
//! - [`persist`] — Append-only log file access
//! - [`writer`] — Write-behind queue and writer thread
//! - [`analytics`] — Mean velocity, max altitude, haversine distance
//! - [`config`] — Cache configuration
//! - [`record`] — Sample type
//! - [`error`] — Error types

pub mod analytics;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod persist;
pub mod record;
pub mod ring;
pub mod writer;

// Re-export primary API types at crate root for convenience.
pub use analytics::FlightSummary;
pub use cache::{FlightCache, LoadReport};
pub use config::{CacheConfig, PersistMode, WriteBehindConfig};
pub use error::{FlightCacheError, FormatError, PersistError, Result};
pub use persist::LineDiagnostic;
pub use record::{Coordinates, LogRecord};
