use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use crate::{
    error::{ConversionError, Result},
    table::{Column, ColumnData},
};

/// Naive layouts tried after RFC 3339, read as UTC. `%.f` is optional when parsing.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
];

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// A timestamp column turned into seconds since midnight of its first day.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    pub seconds: Vec<f64>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeAxis {
    pub fn from_column(column: &Column) -> Result<Self> {
        let ColumnData::Text(cells) = &column.data else {
            return Err(ConversionError::column(
                &column.name,
                format!("holds {} values, not timestamps", column.data.type_name()),
            ));
        };

        let stamps = cells
            .iter()
            .enumerate()
            .map(|(row, cell)| {
                parse_timestamp(cell).ok_or_else(|| {
                    ConversionError::column(
                        &column.name,
                        format!("row {row}: cannot parse '{cell}' as a timestamp"),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let (Some(&start), Some(&end)) = (stamps.first(), stamps.last()) else {
            return Err(ConversionError::column(&column.name, "no rows to build a time axis from"));
        };

        let midnight = start.timestamp() - i64::from(start.num_seconds_from_midnight());
        let seconds = stamps
            .iter()
            .map(|t| (t.timestamp() - midnight) as f64 + f64::from(t.timestamp_subsec_micros()) / 1e6)
            .collect();

        Ok(Self { seconds, start, end })
    }

    /// CF style `units` attribute for the offsets.
    pub fn units(&self) -> String {
        format!("seconds since {} 00:00:00 +00:00", self.start.format("%Y-%m-%d"))
    }

    pub fn start_attr(&self) -> String {
        self.start.format("%Y-%m-%d %H:%M:%SZ").to_string()
    }

    pub fn end_attr(&self) -> String {
        self.end.format("%Y-%m-%d %H:%M:%SZ").to_string()
    }
}
