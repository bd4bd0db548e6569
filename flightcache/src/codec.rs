//! Line codec for the persisted telemetry log.
//!
//! Each record is stored as one line of nine comma-separated fields in the
//! order given by [`FIELD_NAMES`], every field rendered fixed-point with six
//! fractional digits:
//!
//! ```text
//! 1000.000000,28.500000,-80.600000,100.250000,90.000000,340.200000,9.800000,15.000000,1013.250000
//! ```
//!
//! Decoding is all-or-nothing. For any finite record `r`,
//! `parse_line(&format_line(&r))` reproduces `r` to within 1e-6 per field.

use std::fmt::Write as _;

use crate::error::FormatError;
use crate::record::{FIELD_COUNT, FIELD_NAMES, LogRecord};

/// Digits written after the decimal point.
pub const FRACTION_DIGITS: usize = 6;

/// Field separator.
pub const SEPARATOR: char = ',';

/// Encodes a record as one log line, without the trailing newline.
///
/// # Examples
///
/// ```rust
/// use flightcache::LogRecord;
/// use flightcache::codec::format_line;
///
/// let record = LogRecord { timestamp: 1.5, altitude: -2.0, ..LogRecord::default() };
/// assert_eq!(
///     format_line(&record),
///     "1.500000,0.000000,0.000000,-2.000000,0.000000,0.000000,0.000000,0.000000,0.000000",
/// );
/// ```
pub fn format_line(record: &LogRecord) -> String {
    let mut line = String::with_capacity(FIELD_COUNT * 16);
    for (i, value) in record.to_fields().iter().enumerate() {
        if i > 0 {
            line.push(SEPARATOR);
        }
        // Writing into a String cannot fail.
        let _ = write!(line, "{:.*}", FRACTION_DIGITS, value);
    }
    line
}

/// Decodes one log line into a record.
///
/// Surrounding whitespace on each field, including a trailing `\r`, is
/// ignored.
///
/// # Errors
///
/// Returns [`FormatError::FieldCount`] if the line does not have exactly nine
/// fields, [`FormatError::InvalidNumber`] if a field is not a decimal number,
/// and [`FormatError::NonFinite`] if a field decodes to NaN or an infinity.
pub fn parse_line(line: &str) -> Result<LogRecord, FormatError> {
    let found = line.split(SEPARATOR).count();
    if found != FIELD_COUNT {
        return Err(FormatError::FieldCount { found });
    }

    let mut fields = [0.0; FIELD_COUNT];
    for ((slot, text), field) in fields.iter_mut().zip(line.split(SEPARATOR)).zip(FIELD_NAMES) {
        let text = text.trim();
        let value: f64 = text.parse().map_err(|_| FormatError::InvalidNumber {
            field,
            text: text.to_string(),
        })?;
        if !value.is_finite() {
            return Err(FormatError::NonFinite {
                field,
                text: text.to_string(),
            });
        }
        *slot = value;
    }

    Ok(LogRecord::from_fields(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_record() -> LogRecord {
        LogRecord {
            timestamp: 1000.0,
            latitude: 28.5,
            longitude: -80.6,
            altitude: 100.25,
            bearing: 90.0,
            velocity: 340.2,
            acceleration: 9.8,
            temperature: 15.0,
            pressure: 1013.25,
        }
    }

    #[test]
    fn test_format_reference_record() {
        assert_eq!(
            format_line(&reference_record()),
            "1000.000000,28.500000,-80.600000,100.250000,90.000000,340.200000,9.800000,15.000000,1013.250000"
        );
    }

    #[test]
    fn test_parse_reference_line() {
        let record = parse_line(
            "1000.000000,28.500000,-80.600000,100.250000,90.000000,340.200000,9.800000,15.000000,1013.250000",
        )
        .unwrap();
        assert_eq!(record, reference_record());
    }

    #[test]
    fn test_round_trip_within_precision() {
        let records = [
            reference_record(),
            LogRecord::default(),
            LogRecord::from_fields([
                1_700_000_000.123_456_7,
                -33.868_820_1,
                151.209_295_5,
                12_345.678_9,
                359.999_999_4,
                -0.000_000_4,
                -9.806_65,
                -56.5,
                0.000_1,
            ]),
            LogRecord::from_fields([1e12, -1e9, 1e-7, 0.5e-6, -123.456, 7.0, 8.25, 3.3, 1e6]),
        ];

        for record in records {
            let decoded = parse_line(&format_line(&record)).unwrap();
            for ((name, a), b) in FIELD_NAMES.iter().zip(record.to_fields()).zip(decoded.to_fields()) {
                assert!(
                    (a - b).abs() <= 1e-6,
                    "{name}: {a} decoded as {b}"
                );
            }
        }
    }

    #[test]
    fn test_every_field_has_six_fraction_digits() {
        let line = format_line(&reference_record());
        for field in line.split(',') {
            let (_, fraction) = field.split_once('.').unwrap();
            assert_eq!(fraction.len(), 6, "{field}");
        }
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_crlf() {
        let record = parse_line(" 1.0, 2.0 ,3.0,4.0,5.0,6.0,7.0,8.0,9.0\r").unwrap();
        assert_eq!(record.to_fields(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert_eq!(parse_line(""), Err(FormatError::FieldCount { found: 1 }));
        assert_eq!(
            parse_line("1,2,3,4,5,6,7,8"),
            Err(FormatError::FieldCount { found: 8 })
        );
        assert_eq!(
            parse_line("1,2,3,4,5,6,7,8,9,10"),
            Err(FormatError::FieldCount { found: 10 })
        );
        assert_eq!(
            parse_line("1,2,3,4,5,6,7,8,9,"),
            Err(FormatError::FieldCount { found: 10 })
        );
    }

    #[test]
    fn test_parse_rejects_bad_numbers() {
        assert_eq!(
            parse_line("1,2,3,high,5,6,7,8,9"),
            Err(FormatError::InvalidNumber {
                field: "altitude",
                text: "high".to_string(),
            })
        );
        assert_eq!(
            parse_line("1,2,3,4,5,6,7,8,"),
            Err(FormatError::InvalidNumber {
                field: "pressure",
                text: String::new(),
            })
        );
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        assert_eq!(
            parse_line("1,2,3,4,5,NaN,7,8,9"),
            Err(FormatError::NonFinite {
                field: "velocity",
                text: "NaN".to_string(),
            })
        );
        assert!(matches!(
            parse_line("inf,2,3,4,5,6,7,8,9"),
            Err(FormatError::NonFinite { field: "timestamp", .. })
        ));
        assert!(matches!(
            parse_line("1,2,3,4,5,6,7,8,1e999"),
            Err(FormatError::NonFinite { field: "pressure", .. })
        ));
    }
}
