//! The module request turns a parsed [`LogRecord`] into the tracking request
//! replayed against the collector.
//!
//! Building a request is pure string manipulation: no network call happens
//! here. The query string logged by the tracker is kept and extended with the
//! parameters that make the collector accept it as a new visit:
//!
//! - `cdt`: the replay date combined with the time of day of the log record;
//! - `cip`: the client ip, unless the logged request carried one;
//! - `token_auth`: needed by the collector to accept `cdt` and `cip`;
//! - `dp=1`: disables the provider lookup during ingestion;
//! - `idsite`: rewritten to the target site;
//! - `ec_id`: prefixed with the replay date so that orders replayed on
//!   different days don't collide.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use url::form_urlencoded;

pub use self::language::{nth_language, LanguageRotation, ACCEPT_LANGUAGES};
pub use self::tracking_request::{Method, TrackingRequest};
use crate::error::RequestError;
use crate::record::LogRecord;
use crate::site_id::SiteId;

pub mod language;
pub mod tracking_request;

/// Markers of the tracker endpoint in logged urls. Everything up to and
/// including the marker is dropped to get the query string.
const TRACKER_ENDPOINTS: [&str; 2] = ["matomo.php?", "piwik.php?"];

/// Address used when the logged ip is too short to be a real one (e.g. `-`).
pub const FALLBACK_IP: &str = "13.5.111.3";

/// Logged ips shorter than this are replaced with [`FALLBACK_IP`].
const MIN_IP_LENGTH: usize = 9;

/// Matches the site id parameter of a query string.
static SITE_ID_PARAMETER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"idsite=[0-9]+").expect("Site id pattern is a valid regular expression"));

/// The values injected into every replayed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestParams<'a> {
    /// The site receiving the replayed visits.
    pub site_id: SiteId,

    /// The date the visits are replayed on.
    pub replay_date: NaiveDate,

    /// The auth token allowing the collector to accept `cdt` and `cip`.
    pub token_auth: &'a str,
}

/// Builds the full tracking url for `record`: `prefix`, `?` and the query
/// returned by [`build_request_query`].
///
/// # Arguments
///
/// - `record`: The log record to replay.
/// - `params`: The site, replay date and auth token.
/// - `prefix`: The tracker endpoint of the collector, e.g.
///   `http://localhost/matomo.php`.
///
/// # Errors
///
/// Returns [`Err`] if the timestamp of `record` can't be parsed.
pub fn build_request_url(
    record: &LogRecord,
    params: &RequestParams<'_>,
    prefix: &str,
) -> Result<String, RequestError> {
    let query = build_request_query(record, params)?;
    Ok(format!("{prefix}?{query}"))
}

/// Builds the query string replayed for `record`.
///
/// The steps are applied in this order: strip the tracker endpoint, fall back
/// to [`FALLBACK_IP`] for short ips, append `cdt`, append `cip` if missing,
/// append `token_auth`, prefix `ec_id` values with the replay date, append
/// `dp=1`, rewrite `idsite`.
///
/// # Errors
///
/// Returns [`Err`] if the timestamp of `record` can't be parsed.
pub fn build_request_query(
    record: &LogRecord,
    params: &RequestParams<'_>,
) -> Result<String, RequestError> {
    let mut query = tracking_query(&record.url).to_string();

    let ip = if record.ip.len() < MIN_IP_LENGTH {
        FALLBACK_IP
    } else {
        record.ip.as_str()
    };

    let logged_at = record
        .logged_at()
        .ok_or_else(|| RequestError::InvalidTimestamp(record.time.clone()))?;
    let replay_at = params
        .replay_date
        .and_time(logged_at.time())
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    query.push_str("&cdt=");
    query.extend(form_urlencoded::byte_serialize(replay_at.as_bytes()));

    if !has_parameter(&query, "cip") {
        query.push_str("&cip=");
        query.push_str(ip);
    }

    query.push_str("&token_auth=");
    query.extend(form_urlencoded::byte_serialize(params.token_auth.as_bytes()));

    let query = query.replace("ec_id=", &format!("ec_id={}-", params.replay_date));

    let query = query + "&dp=1";

    let site_id = format!("idsite={}", params.site_id);
    Ok(SITE_ID_PARAMETER
        .replace_all(&query, site_id.as_str())
        .into_owned())
}

/// Returns the query string of a logged tracker url.
///
/// The query starts after the first tracker endpoint marker found. Urls
/// without a known marker are cut at the first `?`; urls without `?` are
/// taken to be a bare query string.
fn tracking_query(url: &str) -> &str {
    TRACKER_ENDPOINTS
        .iter()
        .find_map(|endpoint| {
            url.find(endpoint)
                .map(|start| &url[start + endpoint.len()..])
        })
        .or_else(|| url.split_once('?').map(|(_, query)| query))
        .unwrap_or(url)
}

/// Returns `true` if `query` contains the parameter `name`.
fn has_parameter(query: &str, name: &str) -> bool {
    query.split('&').any(|parameter| {
        parameter
            .split_once('=')
            .map_or(parameter, |(key, _)| key)
            == name
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ip: &str, url: &str) -> LogRecord {
        LogRecord {
            ip: ip.to_string(),
            time: "29/May/2011:06:18:38 +0200".to_string(),
            url: url.to_string(),
            referrer: "-".to_string(),
            user_agent: "-".to_string(),
        }
    }

    fn params(site_id: u32) -> RequestParams<'static> {
        RequestParams {
            site_id: SiteId::new(site_id).unwrap(),
            replay_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            token_auth: "0123456789abcdef",
        }
    }

    #[test]
    fn test_build_request_url() {
        let record = record(
            "192.168.33.10",
            "/matomo.php?idsite=5&rec=1&url=http%3A%2F%2Fexample.org%2F",
        );
        let url = build_request_url(&record, &params(9), "http://localhost/matomo.php").unwrap();

        assert_eq!(
            url,
            "http://localhost/matomo.php?idsite=9&rec=1&url=http%3A%2F%2Fexample.org%2F\
             &cdt=2024-01-01+06%3A18%3A38&cip=192.168.33.10&token_auth=0123456789abcdef&dp=1"
        );
    }

    #[test]
    fn test_site_id_is_rewritten() {
        let record = record("192.168.33.10", "/matomo.php?idsite=5&rec=1&idsite=5");
        let url = build_request_url(&record, &params(9), "").unwrap();

        assert!(url.contains("idsite=9"));
        assert!(!url.contains("idsite=5"));
    }

    #[test]
    fn test_order_id_is_prefixed_with_replay_date() {
        let record = record("192.168.33.10", "/matomo.php?idsite=1&idgoal=0&ec_id=ORDER1");
        let query = build_request_query(&record, &params(1)).unwrap();

        assert!(query.contains("ec_id=2024-01-01-ORDER1"));
    }

    #[test]
    fn test_short_ip_falls_back() {
        let query = build_request_query(&record("-", "/matomo.php?idsite=1"), &params(1)).unwrap();
        assert!(query.contains("&cip=13.5.111.3"));

        let query =
            build_request_query(&record("1.2.3.4", "/matomo.php?idsite=1"), &params(1)).unwrap();
        assert!(query.contains("&cip=13.5.111.3"));
    }

    #[test]
    fn test_logged_client_ip_is_kept() {
        let record = record("192.168.33.10", "/matomo.php?idsite=1&cip=10.10.10.10");
        let query = build_request_query(&record, &params(1)).unwrap();

        assert_eq!(query.matches("cip=").count(), 1);
        assert!(query.contains("cip=10.10.10.10"));
    }

    #[test]
    fn test_legacy_tracker_endpoint() {
        let record = record("192.168.33.10", "/piwik/piwik.php?idsite=1&rec=1");
        let query = build_request_query(&record, &params(3)).unwrap();

        assert!(query.starts_with("idsite=3&rec=1&cdt="));
    }

    #[test]
    fn test_unknown_endpoint_uses_query_string() {
        assert_eq!(tracking_query("/js/?idsite=1&rec=1"), "idsite=1&rec=1");
        assert_eq!(tracking_query("idsite=1&rec=1"), "idsite=1&rec=1");
    }

    #[test]
    fn test_invalid_timestamp() {
        let mut record = record("192.168.33.10", "/matomo.php?idsite=1");
        record.time = "yesterday".to_string();

        let result = build_request_query(&record, &params(1));
        assert!(matches!(result, Err(RequestError::InvalidTimestamp(time)) if time == "yesterday"));
    }

    #[test]
    fn test_has_parameter() {
        assert!(has_parameter("idsite=1&cip=1.2.3.4", "cip"));
        assert!(has_parameter("cip&rec=1", "cip"));
        assert!(!has_parameter("idsite=1&recip=1", "cip"));
    }
}
