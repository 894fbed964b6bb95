//! This module contains all the errors returned by the `visit-replay`
//! library.
//!
//! Only `Debug` and `Error` are derived because not all inherited error types
//! implement `Clone` and `Eq`.
//!
//! Failures that the replay deliberately tolerates (a line that doesn't match
//! the log grammar, a tracking request that can't be delivered) are not
//! errors of the run: they are logged and counted by the caller. The enums in
//! this module are for failures that stop an operation.

// Allowing `module_name_repetitions` is needed to make `clippy` happy and keep the suffix `Error`
// for all the error categories.
#![allow(clippy::module_name_repetitions)]

use thiserror::Error;

// If any error is added in the future, make sure to keep all sub-error enums as
// `pub` for ease of access.
pub use self::config::Error as ConfigError;
pub use self::dispatch::Error as DispatchError;
pub use self::report::Error as ReportError;
pub use self::request::Error as RequestError;
pub use self::runner::Error as RunnerError;
pub use self::source::Error as SourceError;
pub use self::token::Error as TokenError;
pub use self::tools::Error as ToolsError;

mod config;
mod dispatch;
mod report;
mod request;
mod runner;
mod source;
mod token;
mod tools;

/// Errors of the live engine, which reads a log file and sends requests
/// itself. The batch replayer returns [`RunnerError`].
#[derive(Debug, Error)]
pub enum Error {
    /// `Error::Config` is caused by an invalid replay configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `Error::Source` is caused by issues reading a log file.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// `Error::Request` is caused by a log record that can't be turned into a
    /// tracking request.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// `Error::Token` is caused by issues obtaining the auth token.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// `Error::Dispatch` is caused by issues delivering a tracking request.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
