//! This file contains the enum `Error` for all the errors returned by the
//! token sources in [`crate::auth`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// `Spawn` variant is for errors starting the token command.
    #[error("Failed to run token command {command:?}: {source}")]
    Spawn {
        /// The command line.
        command: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// `CommandFailed` variant is for token commands exiting with a non-zero
    /// status.
    #[error("Token command {command:?} exited with {status}: {stderr}")]
    CommandFailed {
        /// The command line.
        command: String,
        /// The exit status.
        status: std::process::ExitStatus,
        /// Captured standard error.
        stderr: String,
    },

    /// `Empty` variant is returned when the token source produced no token.
    #[error("The token source returned an empty token.")]
    Empty,

    /// `DecodeBytes` variant is for token commands printing invalid UTF-8.
    #[error(transparent)]
    DecodeBytes(#[from] std::string::FromUtf8Error),
}
