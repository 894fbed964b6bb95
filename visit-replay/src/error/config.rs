//! This file contains the enum `Error` for all the errors returned while
//! validating a replay configuration.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// `InvalidSiteId` is returned for the site id `0`.
    #[error("Site id must be a positive integer, got {0}.")]
    InvalidSiteId(u32),

    /// `InvalidCollectorUrl` is returned when the collector url can't be
    /// parsed.
    #[error("The collector url {url:?} is not valid: {source}")]
    InvalidCollectorUrl {
        /// The rejected url.
        url: String,
        /// The parse error reported by the crate `url`.
        source: url::ParseError,
    },

    /// `UnsupportedCollectorScheme` is returned for collector urls which are
    /// not `http` or `https`.
    #[error("The collector url must use http or https, got {0:?}.")]
    UnsupportedCollectorScheme(String),

    /// `LogFileNotFound` is returned when the log file to replay doesn't
    /// exist.
    #[error("The log file {0:?} does not exist.")]
    LogFileNotFound(PathBuf),

    /// `DataDirNotFound` is returned when the directory of log files to replay
    /// doesn't exist.
    #[error("The data directory {0:?} does not exist.")]
    DataDirNotFound(PathBuf),

    /// `InvalidDayOfMonth` is returned for a day of month outside `1..=31`.
    #[error("Day of month must be between 1 and 31, got {0}.")]
    InvalidDayOfMonth(u32),

    /// `InvalidTimeOfDay` is returned for a time of day not smaller than the
    /// number of seconds in a day.
    #[error("Time of day must be between 0 and 86399 seconds, got {0}.")]
    InvalidTimeOfDay(u32),

    /// `InvalidDays` is returned when the number of days to replay is zero.
    #[error("Days to replay must be greater or equal to 1.")]
    InvalidDays,

    /// `InvalidTimeout` is returned for a zero request timeout.
    #[error("The request timeout must be at least 1 second.")]
    InvalidTimeout,
}
