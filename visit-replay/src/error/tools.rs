//! This file contains the enum `Error` for all the errors returned by the
//! module `tools`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// `InvalidReplacement` is returned for replacement pairs without exactly
    /// one `:` separator.
    #[error(
        "Each replace option needs exactly one separator \":\". For example \"oldValue:newValue\", got {0:?}."
    )]
    InvalidReplacement(String),

    /// `Io` variant is for errors reading or writing log files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
