//! Helpers preparing access logs for replay: [`shorten`] trims a long log to
//! a sample of each day and [`anonymize`] strips personal data before a log is
//! shared.

pub mod anonymize;
pub mod shorten;

pub use self::anonymize::{target_path, Anonymizer, Replacement};
pub use self::shorten::{shorten_log, ShortenSummary, DEFAULT_LINES_PER_DAY};
