//! This is `visit-replay`s representation of the id of the website tracking
//! requests are replayed into.

use std::fmt;

use serde::Serialize;

use crate::error::ConfigError;

/// `SiteId` is represented as a non-zero `u32` integer.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SiteId(u32);
impl SiteId {
    /// Creates a new `SiteId`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `site_id` is 0.
    pub fn new(site_id: u32) -> Result<Self, ConfigError> {
        if site_id == 0 {
            return Err(ConfigError::InvalidSiteId(site_id));
        }
        Ok(SiteId(site_id))
    }

    /// Returns the site id as `u32`.
    #[must_use]
    pub fn get(&self) -> u32 {
        self.0
    }
}
impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
