//! Keeps a fixed number of lines per day of an access log.

use std::io::{BufRead, Write};

use chrono::NaiveDate;

use crate::error::ToolsError;
use crate::record::LogRecord;

/// Number of lines kept per day unless configured otherwise.
pub const DEFAULT_LINES_PER_DAY: usize = 200;

/// Line counts of a [`shorten_log`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShortenSummary {
    /// Lines read from the input.
    pub read: usize,

    /// Lines written to the output.
    pub kept: usize,
}

/// Copies the first `lines_per_day` lines of every day from `input` to
/// `output`.
///
/// A day is a run of consecutive lines logged on the same date; lines that
/// don't parse belong to a day of their own. Lines containing any of
/// `force_keep` are always kept and count toward the limit of their day.
///
/// # Errors
///
/// Returns [`Err`] if `input` can't be read or `output` can't be written.
pub fn shorten_log<R, W>(
    input: R,
    mut output: W,
    lines_per_day: usize,
    force_keep: &[String],
) -> Result<ShortenSummary, ToolsError>
where
    R: BufRead,
    W: Write,
{
    let mut summary = ShortenSummary::default();
    let mut current_date: Option<Option<NaiveDate>> = None;
    let mut kept_today = 0;

    for line in input.lines() {
        let line = line?;
        summary.read += 1;

        let date = LogRecord::parse(&line)
            .and_then(|record| record.logged_at())
            .map(|logged_at| logged_at.date());
        if current_date != Some(date) {
            current_date = Some(date);
            kept_today = 0;
        }

        let forced = force_keep.iter().any(|term| line.contains(term.as_str()));
        if kept_today >= lines_per_day && !forced {
            continue;
        }

        writeln!(output, "{line}")?;
        kept_today += 1;
        summary.kept += 1;
    }

    output.flush()?;
    Ok(summary)
}
