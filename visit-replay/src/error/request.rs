//! This file contains the enum `Error` for all the errors returned while
//! building tracking requests.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// `InvalidTimestamp` variant is for log records whose timestamp doesn't
    /// follow the `DD/Mon/YYYY:HH:MM:SS` format, so the time of day to replay
    /// at is unknown.
    #[error("Timestamp {0:?} of the log record can't be parsed.")]
    InvalidTimestamp(String),
}
