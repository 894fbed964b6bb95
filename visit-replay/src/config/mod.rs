//! This module contains [`ReplayConfig`], the validated parameters of a
//! replay run, and [`Collector`], the analytics endpoint receiving the
//! replayed requests.
//!
//! Every value is checked when the configuration is built. An invalid value
//! is rejected with a [`ConfigError`] before any replay begins; nothing is
//! silently defaulted.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use url::Url;

use crate::auth::TokenAuth;
use crate::error::ConfigError;
use crate::record::SECONDS_IN_DAY;
use crate::site_id::SiteId;

/// Path of the tracker endpoint, relative to the collector base url.
pub const TRACKER_ENDPOINT: &str = "matomo.php";

/// Request timeout used unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The base url of the analytics collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collector {
    /// The base url, always ending with `/`.
    base: Url,

    /// The tracker endpoint resolved against `base`.
    tracker_endpoint: Url,
}

impl Collector {
    /// Creates a new `Collector`.
    ///
    /// A missing trailing `/` is added so that `http://host/analytics` and
    /// `http://host/analytics/` resolve to the same tracker endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `url` is not a valid `http` or `https` url.
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        let mut base = Url::parse(url).map_err(|source| ConfigError::InvalidCollectorUrl {
            url: url.to_string(),
            source,
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedCollectorScheme(base.scheme().to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let tracker_endpoint =
            base.join(TRACKER_ENDPOINT)
                .map_err(|source| ConfigError::InvalidCollectorUrl {
                    url: url.to_string(),
                    source,
                })?;
        Ok(Collector {
            base,
            tracker_endpoint,
        })
    }

    /// Returns the base url of the collector.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Returns the url of the tracker endpoint.
    #[must_use]
    pub fn tracker_endpoint(&self) -> &Url {
        &self.tracker_endpoint
    }
}

impl FromStr for Collector {
    type Err = ConfigError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        Collector::new(url)
    }
}

impl fmt::Display for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}

/// Which log records of a file are replayed by day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DaySelection {
    /// Every record is replayed.
    #[default]
    All,

    /// Only records logged on this day of the month are replayed.
    Exact(u32),

    /// Only records logged on the day of the month closest to (on or after)
    /// the day of this date are replayed. See
    /// [`crate::day_of_month::find_day_of_month_to_use`].
    Nearest(NaiveDate),
}

impl DaySelection {
    /// Maps the day of month option of the command line: `0` disables the
    /// filter.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `day_of_month` is greater than 31.
    pub fn from_day_of_month(day_of_month: u32) -> Result<Self, ConfigError> {
        match day_of_month {
            0 => Ok(DaySelection::All),
            1..=31 => Ok(DaySelection::Exact(day_of_month)),
            _ => Err(ConfigError::InvalidDayOfMonth(day_of_month)),
        }
    }
}

/// The parameters of a replay run.
///
/// The fields are not public to ensure no tampering after the struct is
/// validated.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// The site receiving the replayed visits.
    site_id: SiteId,

    /// The collector receiving the tracking requests.
    collector: Collector,

    /// Timeout of every tracking request.
    timeout: Duration,

    /// How the auth token is obtained.
    token_auth: TokenAuth,

    /// Day of month filter of the live replay.
    day_selection: DaySelection,

    /// Seconds since midnight at which the live replay starts.
    time_of_day: u32,

    /// Width, in seconds, of the window after `time_of_day` in which the
    /// first record of the live replay must fall.
    time_of_day_delta: u32,
}

impl ReplayConfig {
    /// Constructs a new [`ReplayConfig`] with the default timeout, no day of
    /// month filter and a live replay window covering the whole day.
    ///
    /// # Arguments
    ///
    /// - `site_id`: The site receiving the replayed visits.
    /// - `collector`: The collector receiving the tracking requests.
    /// - `token_auth`: How the auth token is obtained.
    #[must_use]
    pub fn new(site_id: SiteId, collector: Collector, token_auth: TokenAuth) -> Self {
        ReplayConfig {
            site_id,
            collector,
            timeout: DEFAULT_TIMEOUT,
            token_auth,
            day_selection: DaySelection::All,
            time_of_day: 0,
            time_of_day_delta: SECONDS_IN_DAY,
        }
    }

    /// Sets the timeout of every tracking request.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `timeout_seconds` is 0.
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Result<Self, ConfigError> {
        if timeout_seconds == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        self.timeout = Duration::from_secs(timeout_seconds);
        Ok(self)
    }

    /// Sets the day of month filter of the live replay.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if an exact day of month is not in `1..=31`.
    pub fn with_day_selection(mut self, day_selection: DaySelection) -> Result<Self, ConfigError> {
        if let DaySelection::Exact(day_of_month) = day_selection {
            if !(1..=31).contains(&day_of_month) {
                return Err(ConfigError::InvalidDayOfMonth(day_of_month));
            }
        }
        self.day_selection = day_selection;
        Ok(self)
    }

    /// Sets the time of day at which the live replay starts and the width of
    /// the window in which the first replayed record must fall.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `time_of_day` is not smaller than 86400.
    pub fn with_time_of_day(
        mut self,
        time_of_day: u32,
        time_of_day_delta: u32,
    ) -> Result<Self, ConfigError> {
        if time_of_day >= SECONDS_IN_DAY {
            return Err(ConfigError::InvalidTimeOfDay(time_of_day));
        }
        self.time_of_day = time_of_day;
        self.time_of_day_delta = time_of_day_delta;
        Ok(self)
    }

    /// Get `site_id` field of [`ReplayConfig`].
    #[must_use]
    pub fn site_id(&self) -> SiteId {
        self.site_id
    }

    /// Get `collector` field of [`ReplayConfig`].
    #[must_use]
    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Get `timeout` field of [`ReplayConfig`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get `token_auth` field of [`ReplayConfig`].
    #[must_use]
    pub fn token_auth(&self) -> &TokenAuth {
        &self.token_auth
    }

    /// Get `day_selection` field of [`ReplayConfig`].
    #[must_use]
    pub fn day_selection(&self) -> DaySelection {
        self.day_selection
    }

    /// Get `time_of_day` field of [`ReplayConfig`].
    #[must_use]
    pub fn time_of_day(&self) -> u32 {
        self.time_of_day
    }

    /// Get `time_of_day_delta` field of [`ReplayConfig`].
    #[must_use]
    pub fn time_of_day_delta(&self) -> u32 {
        self.time_of_day_delta
    }
}
