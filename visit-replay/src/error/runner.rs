//! This file contains the enum `Error` for all the errors returned by the
//! module `runner`.

use std::path::PathBuf;

use thiserror::Error;

use crate::error::{ConfigError, SourceError, TokenError};

#[derive(Debug, Error)]
pub enum Error {
    /// `Source` is used to convert from `SourceError` when a log file can't
    /// be read.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// `Token` is used to convert from `TokenError` when the auth token can't
    /// be obtained before the batch replay starts.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// `Config` is used to convert from `ConfigError` when the replay scope is
    /// rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `DataDir` is for errors walking the data directory in search of log
    /// files.
    #[error("Failed to list log files in {path:?}: {source}")]
    DataDir {
        /// The directory being walked.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
