//! Throughput samples decoded from the statistics payload.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::StatsRow;

pub const UPLOAD_ATTRIBUTE: &str = "Current Upload Speed";
pub const DOWNLOAD_ATTRIBUTE: &str = "Current Download Speed";

/// One chart point: upload and download rates in Kb/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TelemetrySample {
    pub timestamp: DateTime<Utc>,
    pub upload: u64,
    pub download: u64,
}

impl TelemetrySample {
    /// Placeholder appended when a poll fails, so the time axis keeps moving.
    pub fn zero(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            upload: 0,
            download: 0,
        }
    }

    /// Pick the two speed attributes out of a statistics payload. Missing
    /// attributes read as `0`; other attributes are ignored.
    pub fn from_rows(rows: &[StatsRow], timestamp: DateTime<Utc>) -> Self {
        let mut sample = Self::zero(timestamp);
        for row in rows {
            match row.attribute.as_str() {
                UPLOAD_ATTRIBUTE => sample.upload = parse_rate(&row.value),
                DOWNLOAD_ATTRIBUTE => sample.download = parse_rate(&row.value),
                _ => {}
            }
        }
        sample
    }
}

/// Parse a rate: fractions truncate, negatives and garbage become `0`.
pub fn parse_rate(raw: &str) -> u64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v.trunc() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn picks_both_speeds() {
        let rows = vec![
            StatsRow::new(1, UPLOAD_ATTRIBUTE, "120"),
            StatsRow::new(2, DOWNLOAD_ATTRIBUTE, "80"),
            StatsRow::new(3, "Address", "10.0.0.1"),
        ];
        let sample = TelemetrySample::from_rows(&rows, now());
        assert_eq!(sample.upload, 120);
        assert_eq!(sample.download, 80);
    }

    #[test]
    fn missing_attributes_default_to_zero() {
        let rows = vec![StatsRow::new(1, DOWNLOAD_ATTRIBUTE, "42")];
        let sample = TelemetrySample::from_rows(&rows, now());
        assert_eq!(sample.upload, 0);
        assert_eq!(sample.download, 42);
    }

    #[test]
    fn parse_rate_edge_cases() {
        assert_eq!(parse_rate("120.9"), 120);
        assert_eq!(parse_rate(" 7 "), 7);
        assert_eq!(parse_rate("-3"), 0);
        assert_eq!(parse_rate("fast"), 0);
        assert_eq!(parse_rate(""), 0);
        assert_eq!(parse_rate("NaN"), 0);
    }
}
