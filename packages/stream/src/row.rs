//! Positional CSV row parsing.
//!
//! Rows are mapped by column position, never by header name. Anything that
//! does not yield a record with finite coordinates is dropped by returning
//! `None`.

use safety_map_stream_models::{AccidentRecord, EmergencyCall};
use serde::Serialize;

/// Field delimiter for every dataset.
pub const DELIMITER: char = ',';

/// A record type that can be built from the fields of one CSV line.
pub trait CsvRecord: Serialize + Sized {
    /// Minimum number of fields a line must have.
    const MIN_FIELDS: usize;

    /// Builds a record from the split fields of one line.
    ///
    /// Returns `None` if the row is too short or its coordinates are not
    /// finite numbers.
    fn from_fields(fields: &[&str]) -> Option<Self>;

    /// Splits `line` on [`DELIMITER`] and parses it.
    fn from_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(DELIMITER).collect();
        if fields.len() < Self::MIN_FIELDS {
            return None;
        }
        Self::from_fields(&fields)
    }
}

/// Parses a coordinate. Returns `None` if the field is blank, not a
/// number, or not finite.
#[must_use]
pub fn parse_coordinate(field: &str) -> Option<f64> {
    let value = field.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Rejoins every field from `start` onward with the delimiter, so free text
/// containing commas survives the split.
#[must_use]
pub fn join_tail(fields: &[&str], start: usize) -> String {
    fields
        .get(start..)
        .map(|tail| tail.join(",").trim().to_string())
        .unwrap_or_default()
}

fn text(fields: &[&str], index: usize) -> String {
    fields
        .get(index)
        .map(|f| f.trim().to_string())
        .unwrap_or_default()
}

impl CsvRecord for EmergencyCall {
    const MIN_FIELDS: usize = 7;

    fn from_fields(fields: &[&str]) -> Option<Self> {
        if fields.len() < Self::MIN_FIELDS {
            return None;
        }
        let latitude = parse_coordinate(fields[4])?;
        let longitude = parse_coordinate(fields[5])?;

        Some(Self {
            id: text(fields, 0),
            event_id: text(fields, 1),
            police_station: text(fields, 2),
            call_type: text(fields, 3),
            latitude,
            longitude,
            received_at: join_tail(fields, 6),
        })
    }
}

impl CsvRecord for AccidentRecord {
    const MIN_FIELDS: usize = 9;

    fn from_fields(fields: &[&str]) -> Option<Self> {
        if fields.len() < Self::MIN_FIELDS {
            return None;
        }
        let latitude = parse_coordinate(fields[3])?;
        let longitude = parse_coordinate(fields[4])?;

        Some(Self {
            sr_no: text(fields, 0),
            state: text(fields, 1),
            district: text(fields, 2),
            latitude,
            longitude,
            grid_id: text(fields, 5),
            accident_count: fields[6].trim().parse().unwrap_or(1),
            all_india_rank: fields[7].trim().parse().unwrap_or(0),
            ambulance: join_tail(fields, 8),
        })
    }
}
