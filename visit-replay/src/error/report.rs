//! This file contains the enum `Error` for all the errors returned by the
//! module `report`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// `Serde` variant is for errors reported by the crate `serde_json`.
    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    /// `Io` variant is for errors writing the report file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
