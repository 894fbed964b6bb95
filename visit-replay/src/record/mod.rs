//! This module contains [`LogRecord`], the structured representation of a
//! single access log line, and the parser of the combined log format.
//!
//! Only `GET` requests are recognised. Any other line (comments, blank lines,
//! other methods, truncated lines) is not a log record: the parser returns
//! [`None`] and callers filter it out.

use chrono::{Datelike, NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

/// Number of seconds in a day, used to compare records by time of day.
pub const SECONDS_IN_DAY: u32 = 86_400;

/// Format of the date and time part of an access log timestamp, e.g.
/// `29/May/2011:06:18:38`. The UTC offset that follows it is ignored.
const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S";

/// The grammar of a combined log line:
///
/// `IP IDENT USER [TIMESTAMP] "GET URL VERSION" STATUS BYTES "REFERRER" "UA"`
///
/// Referrer and user agent are either a quoted string or a bare `-`.
static LOG_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(\S+) \S+ \S+ \[(.+?)\] "GET (.*?) .*?" \S+ \S+ (-|(?:".*?")) (-|(?:".*?"))"#)
        .expect("Log line grammar is a valid regular expression")
});

/// One parsed access log line.
///
/// All fields are kept as they appear in the log: the timestamp is not
/// normalised and the url is still percent-encoded. Quoted fields have their
/// surrounding quotes removed, while the placeholder `-` is kept as `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogRecord {
    /// The client address, a dotted quad or `-`.
    pub ip: String,

    /// The timestamp including the UTC offset, e.g.
    /// `29/May/2011:06:18:38 +0200`.
    pub time: String,

    /// The request path and query string.
    pub url: String,

    /// The referrer, `-` if absent.
    pub referrer: String,

    /// The user agent, `-` if absent.
    pub user_agent: String,
}

impl LogRecord {
    /// Parses a raw log line.
    ///
    /// Returns [`None`] if `line` doesn't match the combined log grammar or
    /// the request method is not `GET`. A record is never partially filled.
    ///
    /// # Arguments
    ///
    /// - `line`: The raw log line, with or without the trailing newline.
    #[must_use]
    pub fn parse(line: &str) -> Option<LogRecord> {
        let captures = LOG_LINE.captures(line)?;

        Some(LogRecord {
            ip: captures[1].to_string(),
            time: captures[2].to_string(),
            url: captures[3].to_string(),
            referrer: remove_quotes(&captures[4]).to_string(),
            user_agent: remove_quotes(&captures[5]).to_string(),
        })
    }

    /// Returns the wall-clock date and time at which the request was logged.
    ///
    /// The UTC offset is dropped rather than applied: two records logged at
    /// `10:00:00` compare equal regardless of their time zone.
    ///
    /// Returns [`None`] if the timestamp doesn't follow the
    /// `DD/Mon/YYYY:HH:MM:SS` format.
    #[must_use]
    pub fn logged_at(&self) -> Option<NaiveDateTime> {
        let without_offset = self.time.split_whitespace().next()?;
        NaiveDateTime::parse_from_str(without_offset, TIMESTAMP_FORMAT).ok()
    }

    /// Returns the day of the month (`1..=31`) of the record.
    #[must_use]
    pub fn day_of_month(&self) -> Option<u32> {
        self.logged_at().map(|logged_at| logged_at.day())
    }

    /// Returns the time of day of the record as seconds since midnight.
    #[must_use]
    pub fn time_of_day(&self) -> Option<u32> {
        self.logged_at()
            .map(|logged_at| logged_at.num_seconds_from_midnight())
    }
}

/// Strips the surrounding double quotes of a quoted log field. Unquoted values
/// (the `-` placeholder) are returned unchanged.
fn remove_quotes(field: &str) -> &str {
    field
        .strip_prefix('"')
        .and_then(|field| field.strip_suffix('"'))
        .unwrap_or(field)
}
