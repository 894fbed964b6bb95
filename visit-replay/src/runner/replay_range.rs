//! This module contains the implementation of [`ReplayRange`] to keep track of
//! the range of days to be replayed. This struct also ensures to the user
//! that at least one day is replayed.

use chrono::{Days, NaiveDate};

use crate::error::ConfigError;

/// [`ReplayRange`] contains the days that are replayed. The fields are not
/// public to ensure no tampering after the struct is initialised.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReplayRange {
    /// The first day to replay.
    start_date: NaiveDate,

    /// The last day to replay (inclusive).
    end_date: NaiveDate,
}

impl ReplayRange {
    /// Constructs a new [`ReplayRange`] object covering `days` days up to
    /// `end_date`.
    ///
    /// # Arguments
    ///
    /// - `end_date`: The last day to replay (inclusive).
    /// - `days`: The number of days to replay.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `days` is 0 or the range starts before the earliest
    /// representable date.
    pub fn new(end_date: NaiveDate, days: u32) -> Result<ReplayRange, ConfigError> {
        if days == 0 {
            return Err(ConfigError::InvalidDays);
        }
        let start_date = end_date
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or(ConfigError::InvalidDays)?;

        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Get `start_date` field of [`ReplayRange`].
    #[must_use]
    pub fn get_start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Get `end_date` field of [`ReplayRange`].
    #[must_use]
    pub fn get_end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Returns the days of the range, oldest first.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end_date = self.end_date;
        self.start_date
            .iter_days()
            .take_while(move |date| *date <= end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_range() {
        let end_date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let replay_range = ReplayRange::new(end_date, 3).unwrap();

        assert_eq!(
            replay_range.get_start_date(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(replay_range.get_end_date(), end_date);
        assert_eq!(
            replay_range.dates().map(|date| date.to_string()).collect::<Vec<_>>(),
            vec!["2024-02-29", "2024-03-01", "2024-03-02"]
        );
    }

    #[test]
    fn test_single_day() {
        let end_date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let replay_range = ReplayRange::new(end_date, 1).unwrap();

        assert_eq!(replay_range.dates().collect::<Vec<_>>(), vec![end_date]);
    }

    #[test]
    #[should_panic(expected = "Days to replay must be greater or equal to 1.")]
    fn test_replay_range_panic() {
        let end_date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        ReplayRange::new(end_date, 0).unwrap();
    }
}
