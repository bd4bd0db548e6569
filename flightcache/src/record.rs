//! The telemetry sample type.
//!
//! A [`LogRecord`] is one sample from the flight computer: a timestamp plus
//! eight numeric channels. Every field defaults to `0.0` and there is no
//! sentinel for a missing value.

use serde::{Deserialize, Serialize};

/// Number of numeric fields in a record, timestamp included.
pub const FIELD_COUNT: usize = 9;

/// Field names in their canonical order (the order used on disk).
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "timestamp",
    "latitude",
    "longitude",
    "altitude",
    "bearing",
    "velocity",
    "acceleration",
    "temperature",
    "pressure",
];

/// One telemetry sample.
///
/// Timestamps are not required to increase; the cache preserves insertion
/// order and never inspects arrival order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Sample time, in seconds.
    pub timestamp: f64,
    /// Latitude, in degrees.
    pub latitude: f64,
    /// Longitude, in degrees.
    pub longitude: f64,
    /// Altitude, in meters.
    pub altitude: f64,
    /// Heading, in degrees.
    pub bearing: f64,
    /// Speed, in m/s.
    pub velocity: f64,
    /// Acceleration, in m/s².
    pub acceleration: f64,
    /// Temperature, in degrees Celsius.
    pub temperature: f64,
    /// Static pressure, in hPa.
    pub pressure: f64,
}

/// A geographic position taken from a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, in degrees.
    pub latitude: f64,
    /// Longitude, in degrees.
    pub longitude: f64,
    /// Altitude, in meters.
    pub altitude: f64,
}

impl LogRecord {
    /// Builds a record from its fields in canonical order.
    ///
    /// This is the entry point for sensor sources, which always deliver the
    /// same nine channels in the order given by [`FIELD_NAMES`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flightcache::LogRecord;
    ///
    /// let record = LogRecord::from_fields([1.0, 28.5, -80.6, 100.0, 90.0, 340.0, 9.8, 15.0, 1013.25]);
    /// assert_eq!(record.altitude, 100.0);
    /// assert_eq!(record.pressure, 1013.25);
    /// ```
    pub fn from_fields(fields: [f64; FIELD_COUNT]) -> Self {
        let [
            timestamp,
            latitude,
            longitude,
            altitude,
            bearing,
            velocity,
            acceleration,
            temperature,
            pressure,
        ] = fields;

        Self {
            timestamp,
            latitude,
            longitude,
            altitude,
            bearing,
            velocity,
            acceleration,
            temperature,
            pressure,
        }
    }

    /// Returns the fields in canonical order.
    pub fn to_fields(&self) -> [f64; FIELD_COUNT] {
        [
            self.timestamp,
            self.latitude,
            self.longitude,
            self.altitude,
            self.bearing,
            self.velocity,
            self.acceleration,
            self.temperature,
            self.pressure,
        ]
    }

    /// Returns the position part of the record.
    pub fn position(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
        }
    }

    /// Returns the first field holding NaN or an infinity, if any.
    pub fn first_non_finite(&self) -> Option<(&'static str, f64)> {
        FIELD_NAMES
            .iter()
            .zip(self.to_fields())
            .find(|(_, value)| !value.is_finite())
            .map(|(name, value)| (*name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_zero() {
        let record = LogRecord::default();
        assert!(record.to_fields().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_fields_follow_canonical_order() {
        let fields = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let record = LogRecord::from_fields(fields);

        assert_eq!(record.timestamp, 1.0);
        assert_eq!(record.latitude, 2.0);
        assert_eq!(record.longitude, 3.0);
        assert_eq!(record.altitude, 4.0);
        assert_eq!(record.bearing, 5.0);
        assert_eq!(record.velocity, 6.0);
        assert_eq!(record.acceleration, 7.0);
        assert_eq!(record.temperature, 8.0);
        assert_eq!(record.pressure, 9.0);
        assert_eq!(record.to_fields(), fields);
    }

    #[test]
    fn test_position() {
        let record = LogRecord {
            latitude: 28.5,
            longitude: -80.6,
            altitude: 120.0,
            ..LogRecord::default()
        };
        assert_eq!(record.position(), Coordinates {
            latitude: 28.5,
            longitude: -80.6,
            altitude: 120.0,
        });
    }

    #[test]
    fn test_first_non_finite() {
        assert_eq!(LogRecord::default().first_non_finite(), None);

        let record = LogRecord {
            velocity: f64::INFINITY,
            pressure: f64::NAN,
            ..LogRecord::default()
        };
        let (field, value) = record.first_non_finite().unwrap();
        assert_eq!(field, "velocity");
        assert!(value.is_infinite());
    }

    #[test]
    fn test_json_field_names() {
        let record = LogRecord {
            timestamp: 12.5,
            ..LogRecord::default()
        };
        let json = serde_json::to_value(record).unwrap();
        for name in FIELD_NAMES {
            assert!(json.get(name).is_some(), "missing {name}");
        }
        assert_eq!(json["timestamp"], 12.5);
    }
}
