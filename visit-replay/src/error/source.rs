//! This file contains the enum `Error` for all the errors returned by
//! [`crate::source::LogSource`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// `Open` variant is for errors opening (or reopening on reset) a log
    /// file.
    #[error("Failed to open log file {path:?}: {source}")]
    Open {
        /// The log file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// `Closed` variant is returned when resetting a source that has been
    /// closed already.
    #[error("The log source over {0:?} has been closed.")]
    Closed(PathBuf),
}
