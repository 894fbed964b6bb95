//! This module picks the day of the month to replay so that a replay always
//! has data.
//!
//! Log files are finite: replaying "today" against a log that only covers the
//! 5th to the 10th would silently send nothing. Starting from the day of the
//! month of the target date, the search moves forward one day at a time,
//! wrapping from the last day of the target month back to the 1st, until a
//! day present in the log is found.

use std::borrow::Borrow;
use std::collections::BTreeSet;

use chrono::{Datelike, Months, NaiveDate};

use crate::record::LogRecord;

/// Maximum number of days of the month tried before giving up.
const MAX_ATTEMPTS: u32 = 31;

/// Returns the number of days in the month of `date`.
#[must_use]
pub fn days_in_month(date: NaiveDate) -> u32 {
    let first_of_month = date.with_day(1).unwrap_or(date);
    first_of_month
        .checked_add_months(Months::new(1))
        .and_then(|first_of_next_month| first_of_next_month.pred_opt())
        .map_or(31, |last_of_month| last_of_month.day())
}

/// Finds the day of the month to replay.
///
/// The first candidate is the day of the month of `target`; each following
/// candidate is the next day of the month of `target`, wrapping to 1 after
/// the last day. At most 31 candidates are tried; if none is present the last
/// candidate is returned, so the search always terminates but a match is not
/// guaranteed.
///
/// # Arguments
///
/// - `target`: The reference date. Its month bounds the wraparound.
/// - `is_present`: Returns `true` if the log contains records for the given
///   day of the month.
pub fn find_day_of_month_to_use<F>(target: NaiveDate, mut is_present: F) -> u32
where
    F: FnMut(u32) -> bool,
{
    let days_in_month = days_in_month(target);
    let mut day_of_month = target.day();

    for _ in 1..MAX_ATTEMPTS {
        if is_present(day_of_month) {
            return day_of_month;
        }
        day_of_month = if day_of_month >= days_in_month {
            1
        } else {
            day_of_month + 1
        };
    }

    if !is_present(day_of_month) {
        tracing::debug!(
            %target,
            day_of_month,
            "No day of month present in logs, using last candidate"
        );
    }
    day_of_month
}

/// Finds the day of the month to replay among the days present in `records`.
///
/// See [`find_day_of_month_to_use`].
#[must_use]
pub fn find_day_of_month_in_records(target: NaiveDate, records: &[LogRecord]) -> u32 {
    let days_present = days_present(records.iter());
    find_day_of_month_to_use(target, |day| days_present.contains(&day))
}

/// Collects the days of the month of `records`. Records with an unparseable
/// timestamp are ignored.
pub fn days_present<R>(records: impl IntoIterator<Item = R>) -> BTreeSet<u32>
where
    R: Borrow<LogRecord>,
{
    records
        .into_iter()
        .filter_map(|record| record.borrow().day_of_month())
        .collect()
}
