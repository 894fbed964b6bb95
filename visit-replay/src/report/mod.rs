//! This module writes a report of a batch replay. At the moment it exports
//! [`ReplayReport`] as a JSON file.

use std::fs;
use std::ops::{Add, AddAssign};
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ReportError;
use crate::site_id::SiteId;

/// Number of tracking requests delivered and failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayCount {
    /// Requests accepted by the collector.
    pub tracked: usize,

    /// Requests that couldn't be delivered.
    pub failed: usize,
}

impl Add for ReplayCount {
    type Output = ReplayCount;

    fn add(self, other: ReplayCount) -> ReplayCount {
        ReplayCount {
            tracked: self.tracked + other.tracked,
            failed: self.failed + other.failed,
        }
    }
}

impl AddAssign for ReplayCount {
    fn add_assign(&mut self, other: ReplayCount) {
        *self = *self + other;
    }
}

impl std::iter::Sum for ReplayCount {
    fn sum<I: Iterator<Item = ReplayCount>>(iter: I) -> ReplayCount {
        iter.fold(ReplayCount::default(), Add::add)
    }
}

/// The outcome of replaying one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    /// The date the records were replayed on.
    pub date: NaiveDate,

    /// Number of log files replayed.
    pub files: usize,

    /// Requests sent for this day.
    #[serde(flatten)]
    pub count: ReplayCount,
}

/// The outcome of a batch replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    /// The site the visits were replayed into.
    pub site_id: SiteId,

    /// One entry per replayed day, oldest first.
    pub days: Vec<DaySummary>,

    /// Requests sent over all days.
    #[serde(flatten)]
    pub total: ReplayCount,

    /// Wall-clock duration of the replay.
    pub elapsed_seconds: f64,

    /// Delivered requests per second of replay.
    pub requests_per_second: f64,
}

impl ReplayReport {
    /// Builds the report of a replay of `days` which took `elapsed`.
    #[must_use]
    pub fn new(site_id: SiteId, days: Vec<DaySummary>, elapsed: Duration) -> Self {
        let total: ReplayCount = days.iter().map(|day| day.count).sum();
        let elapsed_seconds = elapsed.as_secs_f64();
        #[allow(clippy::cast_precision_loss)] // Request counts are far below 2^52.
        let requests_per_second = if elapsed_seconds > 0.0 {
            total.tracked as f64 / elapsed_seconds
        } else {
            0.0
        };
        ReplayReport {
            site_id,
            days,
            total,
            elapsed_seconds,
            requests_per_second,
        }
    }
}

/// This function writes a [`ReplayReport`] in JSON format to a file.
///
/// If the file already exists, it is overwritten.
///
/// # Arguments
///
/// - `filename`: the file to write.
/// - `report`: the [`ReplayReport`] object.
///
/// # Errors
///
/// Returns [`Err`] if:
///
/// - `filename` can't be written to.
/// - The list of parent directories in `filename` doesn't exist.
pub fn write_to_file(filename: &Path, report: &ReplayReport) -> Result<(), ReportError> {
    let output = serde_json::to_vec_pretty(report)?;
    fs::write(filename, output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn day(day: u32, tracked: usize, failed: usize) -> DaySummary {
        DaySummary {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            files: 2,
            count: ReplayCount { tracked, failed },
        }
    }

    #[test]
    fn test_totals() {
        let report = ReplayReport::new(
            SiteId::new(3).unwrap(),
            vec![day(1, 10, 1), day(2, 30, 0)],
            Duration::from_secs(4),
        );

        assert_eq!(report.total, ReplayCount { tracked: 40, failed: 1 });
        assert!((report.requests_per_second - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_write_to_file() {
        let report = ReplayReport::new(
            SiteId::new(3).unwrap(),
            vec![day(1, 10, 1)],
            Duration::from_secs(2),
        );

        let dir = tempfile::tempdir().unwrap();
        let filename = dir.path().join("report.json");
        write_to_file(&filename, &report).unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&fs::read(&filename).unwrap()).unwrap();
        assert_eq!(
            written,
            json!({
                "site_id": 3,
                "days": [{"date": "2024-03-01", "files": 2, "tracked": 10, "failed": 1}],
                "tracked": 10,
                "failed": 1,
                "elapsed_seconds": 2.0,
                "requests_per_second": 5.0,
            })
        );
    }
}
