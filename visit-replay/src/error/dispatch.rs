//! This file contains the enum `Error` for all the errors returned by a
//! [`crate::dispatch::Dispatcher`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// `Http` variant is for errors reported by the crate `reqwest`, including
    /// timeouts and connection failures.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// `Status` variant is for responses with a non-success status code.
    #[error("The collector answered with status {0}.")]
    Status(u16),

    /// `Rejected` variant is for dispatchers that refuse a request without
    /// sending it.
    #[error("Tracking request rejected: {0}")]
    Rejected(String),
}
