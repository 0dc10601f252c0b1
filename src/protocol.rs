//! Line protocol spoken by the speed sensor.
//!
//! The sensor answers each request byte with one text line:
//!
//! ```text
//! Frequency: 12.50 Hz,Speed: 30.00 km/h\n
//! ```
//!
//! Labels are opaque. Only the `": "` separator, the `,` between the two
//! fields and the trailing units carry structure.

use thiserror::Error;

pub const LINE_TERMINATOR: u8 = b'\n';
const FIELD_DELIMITER: char = ',';
const VALUE_SEPARATOR: &str = ": ";
const FREQUENCY_UNIT: &str = " Hz";
const SPEED_UNIT: &str = " km/h";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub frequency_hz: f64,
    pub speed_kmh: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("expected 2 fields, got {0}")]
    FieldCount(usize),
    #[error("field {0:?} has no \": \" separator")]
    MissingSeparator(String),
    #[error("field value {0:?} is not a number")]
    InvalidNumber(String),
}

pub fn parse_record(record: &str) -> Result<Reading, ParseError> {
    let fields: Vec<&str> = record.trim().split(FIELD_DELIMITER).collect();
    if fields.len() != 2 {
        return Err(ParseError::FieldCount(fields.len()));
    }
    Ok(Reading {
        frequency_hz: parse_field(fields[0], FREQUENCY_UNIT)?,
        speed_kmh: parse_field(fields[1], SPEED_UNIT)?,
    })
}

fn parse_field(field: &str, unit: &str) -> Result<f64, ParseError> {
    let (_, value) = field
        .split_once(VALUE_SEPARATOR)
        .ok_or_else(|| ParseError::MissingSeparator(field.to_string()))?;
    let value = value.trim_end();
    let number = value.strip_suffix(unit).unwrap_or(value).trim();
    number
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber(number.to_string()))
}

/// Accumulates raw bytes until a line terminator shows up.
///
/// Bytes are kept undecoded so a multi-byte character split across two reads
/// survives. Anything received after a terminator stays buffered as the start
/// of the next record.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut records = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == LINE_TERMINATOR) {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            records.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        records
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_well_formed_line() {
        let reading = parse_record("F: 12.5 Hz,S: 30.0 km/h\n").unwrap();
        assert_eq!(
            reading,
            Reading {
                frequency_hz: 12.5,
                speed_kmh: 30.0
            }
        );
    }

    #[test]
    fn handles_carriage_return() {
        let reading = parse_record("Frequency: 880.00 Hz,Speed: 14.21 km/h\r").unwrap();
        assert_eq!(reading.frequency_hz, 880.0);
        assert_eq!(reading.speed_kmh, 14.21);
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            parse_record("F: 1 Hz"),
            Err(ParseError::FieldCount(1))
        );
        assert_eq!(
            parse_record("F: 1 Hz,S: 2 km/h,X: 3"),
            Err(ParseError::FieldCount(3))
        );
    }

    #[test]
    fn rejects_non_numeric_value() {
        assert!(matches!(
            parse_record("F: abc Hz,S: 2 km/h"),
            Err(ParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_record("F: 1 Hz,S: fast km/h"),
            Err(ParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn rejects_field_without_separator() {
        assert!(matches!(
            parse_record("F 1 Hz,S: 2 km/h"),
            Err(ParseError::MissingSeparator(_))
        ));
    }

    #[test]
    fn assembles_across_chunks() {
        let mut assembler = LineAssembler::new();
        assert!(assembler.push(b"F: 1.0 H").is_empty());
        assert!(assembler.push(b"z,S: 2.0").is_empty());
        let records = assembler.push(b" km/h\nF: 3");
        assert_eq!(records, vec!["F: 1.0 Hz,S: 2.0 km/h".to_string()]);
        assert_eq!(assembler.pending(), 4);
    }

    #[test]
    fn yields_every_complete_line() {
        let mut assembler = LineAssembler::new();
        let records = assembler.push(b"a\nb\n");
        assert_eq!(records, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(assembler.pending(), 0);
    }

    proptest! {
        #[test]
        fn formatted_readings_parse_back(freq in 0.0f64..10_000.0, speed in 0.0f64..500.0) {
            let line = format!("Frequency: {freq} Hz,Speed: {speed} km/h\n");
            let reading = parse_record(&line).unwrap();
            prop_assert_eq!(reading.frequency_hz, freq);
            prop_assert_eq!(reading.speed_kmh, speed);
        }

        #[test]
        fn arbitrary_input_never_panics(line in ".*") {
            let _ = parse_record(&line);
        }
    }
}
