//! Timestamp parsing shared by recency and calendar features.
//!
//! Accepted: RFC 3339 (converted to UTC), `YYYY-MM-DD HH:MM:SS[.fff]`,
//! `YYYY-MM-DDTHH:MM:SS[.fff]`, minute precision, and bare dates (midnight).

use crate::{
    error::{FeatureError, FeatureResult},
    table::Column,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
];

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.naive_utc());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse every cell; the first missing or unparseable cell is an error.
pub fn parse_strict(column: &Column, name: &str) -> FeatureResult<Vec<NaiveDateTime>> {
    (0..column.len())
        .map(|row| {
            let parsed = match column {
                Column::Timestamp(v) => v[row],
                Column::Text(v)      => v[row].as_deref().and_then(parse_timestamp),
                _                    => None,
            };
            parsed.ok_or_else(|| {
                let err = FeatureError::TimestampParse {
                    column: name.to_string(),
                    row,
                    value:  column.render(row),
                };
                log::error!("{err}");
                err
            })
        })
        .collect()
}

/// Parse every cell, turning unparseable cells into missing values.
/// Returns the parsed values and how many non-missing cells were coerced.
pub fn parse_coerce(column: &Column) -> (Vec<Option<NaiveDateTime>>, usize) {
    let mut coerced = 0;
    let values = (0..column.len())
        .map(|row| {
            let parsed = match column {
                Column::Timestamp(v) => v[row],
                Column::Text(v)      => v[row].as_deref().and_then(parse_timestamp),
                _                    => None,
            };
            if parsed.is_none() && !column.is_null(row) {
                coerced += 1;
            }
            parsed
        })
        .collect();
    (values, coerced)
}
