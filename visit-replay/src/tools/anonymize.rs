//! Removes personal data from an access log so that it can be shared.
//!
//! Every line goes through the user supplied word replacements first. Then
//! the last two octets of a leading IPv4 address are zeroed, and the domains
//! of the tracked page, of its referrer and of the request referrer are
//! replaced with placeholder domains.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use url::form_urlencoded;

use crate::error::ToolsError;

/// Domain replacing the domain of the tracked page.
pub const PAGE_DOMAIN: &str = "http://example.org";

/// Domain replacing the domain of referrers.
pub const REFERRER_DOMAIN: &str = "http://example.com";

/// Extension of anonymized log files.
const LOG_SUFFIX: &str = ".log";

/// Byte offset from which the end of the domain is searched, past `https://`.
const DOMAIN_SEARCH_START: usize = 8;

/// A leading IPv4 address.
static IPV4_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})")
        .expect("IPv4 pattern is a valid regular expression")
});

/// A `GET` line with quoted referrer and user agent. Captures the url and the
/// referrer.
static TRACKED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\S+ \S+ \S+ \[.*?\] "GET (\S+.*?)" \d+ \d+ "(.*?)" ".*?""#)
        .expect("Tracked line pattern is a valid regular expression")
});

/// A word replacement given as `old:new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// The text to replace.
    old: String,

    /// The replacement text.
    new: String,
}

impl Replacement {
    /// Creates a replacement of `old` with `new`.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `old` is empty.
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Result<Self, ToolsError> {
        let old = old.into();
        let new = new.into();
        if old.is_empty() {
            return Err(ToolsError::InvalidReplacement(format!(":{new}")));
        }
        Ok(Replacement { old, new })
    }
}

impl FromStr for Replacement {
    type Err = ToolsError;

    /// Parses `old:new`. There must be exactly one `:`.
    fn from_str(pair: &str) -> Result<Self, Self::Err> {
        let mut words = pair.split(':');
        match (words.next(), words.next(), words.next()) {
            (Some(old), Some(new), None) if !old.is_empty() => Replacement::new(old, new),
            _ => Err(ToolsError::InvalidReplacement(pair.to_string())),
        }
    }
}

/// Anonymizes access log lines.
#[derive(Debug, Clone, Default)]
pub struct Anonymizer {
    /// Applied to every line, in order.
    replacements: Vec<Replacement>,
}

impl Anonymizer {
    /// Creates an anonymizer applying `replacements` before the built-in
    /// rules.
    #[must_use]
    pub fn new(replacements: Vec<Replacement>) -> Self {
        Anonymizer { replacements }
    }

    /// Returns the anonymized version of `line`.
    ///
    /// Lines which are not `GET` requests only get the word replacements and
    /// the ip anonymization.
    #[must_use]
    pub fn anonymize_line(&self, line: &str) -> String {
        let line = self
            .replacements
            .iter()
            .fold(line.to_string(), |line, replacement| {
                line.replace(&replacement.old, &replacement.new)
            });
        let line = IPV4_PREFIX.replace(&line, "${1}.${2}.0.0").into_owned();
        anonymize_domains(line)
    }

    /// Anonymizes every line of `input` into `output`. Returns the number of
    /// lines written.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `input` can't be read or `output` can't be written.
    pub fn anonymize_log<R, W>(&self, input: R, mut output: W) -> Result<usize, ToolsError>
    where
        R: BufRead,
        W: Write,
    {
        let mut lines = 0;
        for line in input.lines() {
            writeln!(output, "{}", self.anonymize_line(&line?))?;
            lines += 1;
        }
        output.flush()?;
        Ok(lines)
    }
}

/// Returns the path of the anonymized copy of `input` in `out_dir`: the file
/// name of `input` with a `.log` suffix.
#[must_use]
pub fn target_path(out_dir: &Path, input: &Path) -> PathBuf {
    let mut file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !file_name.ends_with(LOG_SUFFIX) {
        file_name.push_str(LOG_SUFFIX);
    }
    out_dir.join(file_name)
}

/// Replaces the domains of the `url` and `urlref` tracking parameters and of
/// the referrer.
fn anonymize_domains(mut line: String) -> String {
    let Some(captures) = TRACKED_LINE.captures(&line) else {
        return line;
    };
    let request = captures[1].to_string();
    let referrer = captures[2].to_string();

    let query = request
        .split_whitespace()
        .next()
        .and_then(|path| path.split_once('?'))
        .map(|(_, query)| query);
    if let Some(query) = query {
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            let domain = match name.as_ref() {
                "url" => PAGE_DOMAIN,
                "urlref" => REFERRER_DOMAIN,
                _ => continue,
            };
            if value.is_empty() {
                continue;
            }
            let anonymized = replace_domain(&value, domain);
            line = line.replace(&url_encode(&value), &url_encode(&anonymized));
        }
    }

    if referrer.is_empty() {
        return line;
    }
    let anonymized = replace_domain(&referrer, REFERRER_DOMAIN);
    line.replace(&referrer, &anonymized)
}

/// Replaces the scheme and host of `url` with `domain`. Urls not starting with
/// `http` are returned unchanged.
fn replace_domain(url: &str, domain: &str) -> String {
    if !url.starts_with("http") {
        return url.to_string();
    }
    let end_of_domain = url
        .get(DOMAIN_SEARCH_START..)
        .and_then(|rest| rest.find('/'))
        .map_or(url.len(), |position| position + DOMAIN_SEARCH_START);
    url.replace(&url[..end_of_domain], domain)
}

/// Encodes `value` the way it appears in a query string.
fn url_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = r#"192.168.33.10 - - [29/May/2011:06:18:38 +0200] "GET /piwik.php?idsite=1&rec=1&url=http%3A%2F%2Fshop.acme.net%2Findex.htm&urlref=http%3A%2F%2Fsearch.acme.net%2F%3Fq%3Dacme HTTP/1.1" 200 43 "http://blog.acme.net/post/1" "Mozilla/5.0""#;

    #[test]
    fn test_anonymize_line() {
        let line = Anonymizer::default().anonymize_line(LINE);

        assert!(line.starts_with("192.168.0.0 - - "));
        assert!(line.contains("url=http%3A%2F%2Fexample.org%2Findex.htm"));
        assert!(line.contains("urlref=http%3A%2F%2Fexample.com%2F%3Fq%3Dacme"));
        assert!(line.contains(r#" "http://example.com/post/1" "#));
        assert!(!line.contains("acme.net"));
    }

    #[test]
    fn test_replacements_apply_first() {
        let anonymizer = Anonymizer::new(vec!["Mozilla:Browser".parse().unwrap()]);
        let line = anonymizer.anonymize_line(LINE);

        assert!(line.ends_with(r#""Browser/5.0""#));
    }

    #[test]
    fn test_other_lines_only_lose_the_ip() {
        let line = r#"10.20.30.40 - - [29/May/2011:06:18:38 +0200] "POST /matomo.php HTTP/1.1" 204 0 "http://blog.acme.net/" "UA""#;
        let anonymized = Anonymizer::default().anonymize_line(line);

        assert!(anonymized.starts_with("10.20.0.0 "));
        assert!(anonymized.contains("blog.acme.net"));
    }

    #[test]
    fn test_replace_domain() {
        assert_eq!(
            replace_domain("https://www.acme.net/a/b?c=d", PAGE_DOMAIN),
            "http://example.org/a/b?c=d"
        );
        assert_eq!(replace_domain("http://acme.net", PAGE_DOMAIN), PAGE_DOMAIN);
        assert_eq!(replace_domain("-", PAGE_DOMAIN), "-");
    }

    #[test]
    fn test_parse_replacement() {
        assert_eq!(
            "acme:example".parse::<Replacement>().unwrap(),
            Replacement::new("acme", "example").unwrap()
        );
        assert!(matches!(
            "a:b:c".parse::<Replacement>(),
            Err(ToolsError::InvalidReplacement(pair)) if pair == "a:b:c"
        ));
        assert!("nocolon".parse::<Replacement>().is_err());
    }

    #[test]
    fn test_target_path() {
        let out_dir = Path::new("/data");
        assert_eq!(
            target_path(out_dir, Path::new("/tmp/access.log")),
            Path::new("/data/access.log")
        );
        assert_eq!(
            target_path(out_dir, Path::new("/tmp/access.log.1")),
            Path::new("/data/access.log.1.log")
        );
    }
}
