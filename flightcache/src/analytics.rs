//! Read-only reductions over buffered telemetry.
//!
//! Every function here takes records in chronological order (oldest first)
//! and never touches the log file. Empty input is not an error: the
//! reductions return `0.0`.
//!
//! # Distance
//!
//! Ground distance between two samples is the haversine great-circle
//! distance on a sphere of radius [`EARTH_RADIUS_M`]. Altitude is ignored.
//! [`total_distance`] sums it over each pair of adjacent samples, so `k`
//! samples contribute exactly `k - 1` legs.

use serde::Serialize;

use crate::record::{Coordinates, LogRecord};

/// Mean Earth radius, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two positions given in degrees.
///
/// # Examples
///
/// ```rust
/// use flightcache::analytics::haversine_distance;
/// use flightcache::record::Coordinates;
///
/// let equator = Coordinates { latitude: 0.0, longitude: 0.0, altitude: 0.0 };
/// let one_degree_east = Coordinates { longitude: 1.0, ..equator };
///
/// let meters = haversine_distance(equator, one_degree_east);
/// assert!((meters - 111_194.93).abs() < 0.01);
/// ```
pub fn haversine_distance(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let half_lat = (delta_lat / 2.0).sin();
    let half_lon = (delta_lon / 2.0).sin();
    let a = half_lat * half_lat + lat1.cos() * lat2.cos() * half_lon * half_lon;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Arithmetic mean of `velocity`, or `0.0` for no records.
pub fn average_velocity<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a LogRecord>,
{
    let (sum, count) = records
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), r| (sum + r.velocity, count + 1));

    if count == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)] // record counts are far below 2^52
    let count = count as f64;
    sum / count
}

/// Largest `altitude`, or `0.0` for no records.
pub fn max_altitude<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a LogRecord>,
{
    records
        .into_iter()
        .map(|r| r.altitude)
        .reduce(f64::max)
        .unwrap_or(0.0)
}

/// Sum of the ground distances between adjacent records, in meters.
pub fn total_distance<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a LogRecord>,
{
    legs(records).sum()
}

/// Distances between each record and its successor.
///
/// The newest record has no successor and starts no leg.
fn legs<'a, I>(records: I) -> impl Iterator<Item = f64>
where
    I: IntoIterator<Item = &'a LogRecord>,
{
    let mut previous: Option<Coordinates> = None;
    records.into_iter().filter_map(move |record| {
        let here = record.position();
        previous
            .replace(here)
            .map(|there| haversine_distance(there, here))
    })
}

/// All analytics for a window of records, computed in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FlightSummary {
    /// Number of records in the window.
    pub count: usize,
    /// Timestamp of the oldest record.
    pub first_timestamp: Option<f64>,
    /// Timestamp of the newest record.
    pub last_timestamp: Option<f64>,
    /// Mean velocity (m/s).
    pub average_velocity: f64,
    /// Highest altitude (m).
    pub max_altitude: f64,
    /// Ground distance covered (m).
    pub total_distance: f64,
    /// Number of adjacent pairs summed into `total_distance`.
    pub legs: usize,
}

impl FlightSummary {
    /// Summarizes records given oldest first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flightcache::LogRecord;
    /// use flightcache::analytics::FlightSummary;
    ///
    /// let records = [
    ///     LogRecord { timestamp: 0.0, altitude: 5.0, velocity: 10.0, ..LogRecord::default() },
    ///     LogRecord { timestamp: 1.0, altitude: 12.0, velocity: 20.0, ..LogRecord::default() },
    ///     LogRecord { timestamp: 2.0, altitude: 3.0, velocity: 30.0, ..LogRecord::default() },
    /// ];
    ///
    /// let summary = FlightSummary::over(&records);
    /// assert_eq!(summary.count, 3);
    /// assert_eq!(summary.legs, 2);
    /// assert_eq!(summary.max_altitude, 12.0);
    /// assert_eq!(summary.average_velocity, 20.0);
    /// ```
    pub fn over<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a LogRecord>,
    {
        let mut summary = Self::default();
        let mut velocity_sum = 0.0;
        let mut altitude: Option<f64> = None;
        let mut previous: Option<Coordinates> = None;

        for record in records {
            summary.count += 1;
            summary.first_timestamp.get_or_insert(record.timestamp);
            summary.last_timestamp = Some(record.timestamp);
            velocity_sum += record.velocity;
            altitude = Some(altitude.map_or(record.altitude, |a| a.max(record.altitude)));

            let here = record.position();
            if let Some(there) = previous.replace(here) {
                summary.total_distance += haversine_distance(there, here);
                summary.legs += 1;
            }
        }

        if summary.count > 0 {
            #[allow(clippy::cast_precision_loss)] // record counts are far below 2^52
            let count = summary.count as f64;
            summary.average_velocity = velocity_sum / count;
        }
        summary.max_altitude = altitude.unwrap_or(0.0);
        summary
    }

    /// Time between the oldest and newest record, or `0.0` if fewer than two.
    pub fn duration(&self) -> f64 {
        match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}
