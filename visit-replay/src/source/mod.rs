//! This module contains [`LogSource`], a forward-only cursor over the records
//! of a log file.
//!
//! A source is assembled with [`LogSourceBuilder`] from composable stages
//! (`map`, `filter_map`, `filter`) applied lazily to the numbered lines of the
//! file, so new filters don't need to touch the file I/O code:
//!
//! ```no_run
//! use visit_replay::source::LogSource;
//!
//! let mut source = LogSource::records_builder("access.log")
//!     .filter(|_, record| record.day_of_month() == Some(23))
//!     .open()?;
//! while let Some((line_number, record)) = source.next() {
//!     println!("{line_number}: {}", record.url);
//! }
//! source.close();
//! # Ok::<(), visit_replay::error::SourceError>(())
//! ```
//!
//! The file is opened by [`LogSourceBuilder::open`] and released by
//! [`LogSource::close`] (or when the source is dropped).

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::SourceError;
use crate::record::LogRecord;

/// A record of type `T` paired with the 1-based number of the line it was
/// read from.
pub type Numbered<T> = (usize, T);

/// The lazy sequence produced by a chain of stages.
type Stages<T> = Box<dyn Iterator<Item = Numbered<T>> + Send>;

/// Rebuilds the chain of stages on top of a freshly opened file. Kept so that
/// [`LogSource::reset`] can replay the same pipeline from the first line.
type Pipeline<T> = Arc<dyn Fn(LineReader) -> Stages<T> + Send + Sync>;

/// Numbered lines of a log file.
///
/// Lines are numbered from 1 and returned without the trailing newline.
/// Bytes which are not valid UTF-8 are replaced with `U+FFFD`, so such a line
/// still counts and reading goes on. Only an I/O error ends the sequence.
pub struct LineReader {
    /// The open file.
    reader: BufReader<File>,

    /// Number of the last line returned.
    line_number: usize,
}

impl LineReader {
    /// Opens `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the file can't be opened.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(LineReader {
            reader: BufReader::new(file),
            line_number: 0,
        })
    }
}

impl Iterator for LineReader {
    type Item = Numbered<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = Vec::new();
        match self.reader.read_until(b'\n', &mut buffer) {
            Ok(0) => None,
            Ok(_) => {
                if buffer.last() == Some(&b'\n') {
                    buffer.pop();
                    if buffer.last() == Some(&b'\r') {
                        buffer.pop();
                    }
                }
                self.line_number += 1;
                let line = String::from_utf8_lossy(&buffer).into_owned();
                Some((self.line_number, line))
            }
            Err(error) => {
                tracing::warn!(
                    line = self.line_number + 1,
                    %error,
                    "Stopping at unreadable log line"
                );
                None
            }
        }
    }
}

/// Describes how the lines of a log file are turned into items of type `T`.
///
/// Nothing is read until [`LogSourceBuilder::open`] is called.
pub struct LogSourceBuilder<T> {
    /// The log file.
    path: PathBuf,

    /// The chain of stages applied so far.
    pipeline: Pipeline<T>,
}

impl LogSourceBuilder<String> {
    /// Starts a pipeline yielding the raw lines of `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LogSourceBuilder {
            path: path.into(),
            pipeline: Arc::new(|lines: LineReader| -> Stages<String> { Box::new(lines) }),
        }
    }
}

impl<T: Send + 'static> LogSourceBuilder<T> {
    /// Adds a stage transforming every item.
    #[must_use]
    pub fn map<U, F>(self, transform: F) -> LogSourceBuilder<U>
    where
        U: Send + 'static,
        F: Fn(usize, T) -> U + Send + Sync + 'static,
    {
        self.filter_map(move |line_number, item| Some(transform(line_number, item)))
    }

    /// Adds a stage transforming every item and dropping those for which
    /// `transform` returns [`None`].
    #[must_use]
    pub fn filter_map<U, F>(self, transform: F) -> LogSourceBuilder<U>
    where
        U: Send + 'static,
        F: Fn(usize, T) -> Option<U> + Send + Sync + 'static,
    {
        let previous = self.pipeline;
        let transform = Arc::new(transform);
        LogSourceBuilder {
            path: self.path,
            pipeline: Arc::new(move |lines: LineReader| -> Stages<U> {
                let transform = Arc::clone(&transform);
                Box::new(previous(lines).filter_map(move |(line_number, item)| {
                    transform(line_number, item).map(|item| (line_number, item))
                }))
            }),
        }
    }

    /// Adds a stage keeping only the items for which `predicate` returns
    /// `true`.
    #[must_use]
    pub fn filter<F>(self, predicate: F) -> LogSourceBuilder<T>
    where
        F: Fn(usize, &T) -> bool + Send + Sync + 'static,
    {
        self.filter_map(move |line_number, item| predicate(line_number, &item).then_some(item))
    }

    /// Opens the log file and positions the cursor on the first item.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the file can't be opened.
    pub fn open(self) -> Result<LogSource<T>, SourceError> {
        let mut source = LogSource {
            path: self.path,
            pipeline: self.pipeline,
            stages: None,
            current: None,
        };
        source.rewind()?;
        Ok(source)
    }
}

/// A single-pass cursor over the items of a log file.
///
/// [`LogSource::valid`] tells whether the cursor points at an item without
/// advancing it. Once the end of the file is reached the source stays invalid;
/// reading it again requires an explicit [`LogSource::reset`].
pub struct LogSource<T> {
    /// The log file.
    path: PathBuf,

    /// Chain of stages, reapplied on reset.
    pipeline: Pipeline<T>,

    /// The remaining items. `None` once the source has been closed.
    stages: Option<Stages<T>>,

    /// The item the cursor points at.
    current: Option<Numbered<T>>,
}

impl LogSource<LogRecord> {
    /// Starts the standard pipeline over `path`: lines that don't parse as a
    /// [`LogRecord`] are skipped.
    ///
    /// Lines that fail to parse are logged at debug level unless they are
    /// `POST` requests, which are expected in tracker logs and skipped
    /// silently.
    pub fn records_builder(path: impl Into<PathBuf>) -> LogSourceBuilder<LogRecord> {
        LogSourceBuilder::new(path).filter_map(|line_number, line| {
            let record = LogRecord::parse(&line);
            if record.is_none() && !line.contains("POST") {
                tracing::debug!(line_number, %line, "Failed to parse log line");
            }
            record
        })
    }

    /// Opens `path` with the standard record pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the file can't be opened.
    pub fn records(path: impl Into<PathBuf>) -> Result<Self, SourceError> {
        Self::records_builder(path).open()
    }
}

impl<T> LogSource<T> {
    /// Returns `true` if the cursor points at an item.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.current.is_some()
    }

    /// Returns the item the cursor points at.
    #[must_use]
    pub fn current(&self) -> Option<&T> {
        self.current.as_ref().map(|(_, item)| item)
    }

    /// Returns the line number of the item the cursor points at.
    #[must_use]
    pub fn line_number(&self) -> Option<usize> {
        self.current.as_ref().map(|(line_number, _)| *line_number)
    }

    /// Moves the cursor to the next item. Does nothing once the source is
    /// exhausted.
    pub fn advance(&mut self) {
        self.current = self.stages.as_mut().and_then(Iterator::next);
    }

    /// Rewinds the source to the first item by reopening the file and
    /// reapplying every stage.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the source has been closed or the file can't be
    /// reopened.
    pub fn reset(&mut self) -> Result<(), SourceError> {
        if self.stages.is_none() {
            return Err(SourceError::Closed(self.path.clone()));
        }
        self.rewind()
    }

    /// Releases the file handle. The source is invalid afterwards.
    pub fn close(&mut self) {
        self.stages = None;
        self.current = None;
    }

    /// Returns `true` if [`LogSource::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.stages.is_none()
    }

    /// Returns the path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the file and primes the cursor.
    fn rewind(&mut self) -> Result<(), SourceError> {
        let lines = LineReader::open(&self.path)?;
        let mut stages = (self.pipeline)(lines);
        self.current = stages.next();
        self.stages = Some(stages);
        Ok(())
    }
}

impl<T> Iterator for LogSource<T> {
    type Item = Numbered<T>;

    /// Returns the current item and advances the cursor.
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        self.advance();
        Some(current)
    }
}

impl<T> fmt::Debug for LogSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSource")
            .field("path", &self.path)
            .field("line_number", &self.line_number())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use indoc::indoc;
    use tempfile::NamedTempFile;

    use super::*;

    const LOG: &str = indoc! {r#"
        ##### YOU CAN REPLACE THIS FILE WITH YOUR OWN LOGS
        1.2.3.4 - - [22/Mar/2024:10:00:00 +0000] "GET /matomo.php?idsite=1&rec=1 HTTP/1.1" 200 43 "-" "UA-1"
        1.2.3.4 - - [22/Mar/2024:10:00:05 +0000] "POST /matomo.php HTTP/1.1" 204 0 "-" "UA-1"

        5.6.7.8 - - [23/Mar/2024:11:00:00 +0000] "GET /matomo.php?idsite=1&rec=1 HTTP/1.1" 200 43 "-" "UA-2"
        9.9.9.9 - - [23/Mar/2024:11:30:00 +0000] "GET /matomo.php?idsite=1&rec=1 HTTP/1.1" 200 43 "-" "UA-3"
    "#};

    fn log_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_raw_lines_are_numbered_from_one() {
        let file = log_file("first\nsecond\n");
        let lines: Vec<_> = LogSourceBuilder::new(file.path()).open().unwrap().collect();

        assert_eq!(
            lines,
            vec![(1, "first".to_string()), (2, "second".to_string())]
        );
    }

    #[test]
    fn test_records_skip_unparseable_lines() {
        let file = log_file(LOG);
        let records: Vec<_> = LogSource::records(file.path()).unwrap().collect();

        let line_numbers: Vec<usize> = records.iter().map(|(line, _)| *line).collect();
        assert_eq!(line_numbers, vec![2, 5, 6]);
        assert_eq!(records[1].1.ip, "5.6.7.8");
    }

    #[test]
    fn test_stages_compose() {
        let file = log_file(LOG);
        let user_agents: Vec<_> = LogSource::records_builder(file.path())
            .filter(|_, record| record.day_of_month() == Some(23))
            .map(|_, record| record.user_agent)
            .open()
            .unwrap()
            .map(|(_, user_agent)| user_agent)
            .collect();

        assert_eq!(user_agents, vec!["UA-2", "UA-3"]);
    }

    #[test]
    fn test_cursor_is_forward_only() {
        let file = log_file(LOG);
        let mut source = LogSource::records(file.path()).unwrap();

        assert!(source.valid());
        assert_eq!(source.line_number(), Some(2));
        // Querying doesn't advance.
        assert_eq!(source.line_number(), Some(2));

        source.advance();
        source.advance();
        assert_eq!(source.current().unwrap().ip, "9.9.9.9");

        source.advance();
        assert!(!source.valid());
        source.advance();
        assert!(!source.valid());
        assert_eq!(source.next(), None);
    }

    #[test]
    fn test_reset_rewinds_to_first_item() {
        let file = log_file(LOG);
        let mut source = LogSource::records(file.path()).unwrap();
        while source.next().is_some() {}
        assert!(!source.valid());

        source.reset().unwrap();
        assert_eq!(source.line_number(), Some(2));
    }

    #[test]
    fn test_close_releases_source() {
        let file = log_file(LOG);
        let mut source = LogSource::records(file.path()).unwrap();

        source.close();
        assert!(source.is_closed());
        assert!(!source.valid());
        assert!(matches!(source.reset(), Err(SourceError::Closed(_))));
    }

    #[test]
    fn test_invalid_utf8_line_does_not_end_the_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            b"1.2.3.4 - - [23/Mar/2024:11:00:00 +0000] \"GET /matomo.php?idsite=1 HTTP/1.1\" 200 43 \"-\" \"UA-1\"\r\n\
              1.2.3.4 - - [23/Mar/2024:11:00:01 +0000] \"GET /matomo.php?idsite=1 HTTP/1.1\" 200 43 \"-\" \"UA-\xff\"\n\
              1.2.3.4 - - [23/Mar/2024:11:00:02 +0000] \"GET /matomo.php?idsite=1 HTTP/1.1\" 200 43 \"-\" \"UA-3\"\n",
        )
        .unwrap();

        let records: Vec<_> = LogSource::records(file.path()).unwrap().collect();

        let line_numbers: Vec<usize> = records.iter().map(|(line, _)| *line).collect();
        assert_eq!(line_numbers, vec![1, 2, 3]);
        assert_eq!(records[0].1.user_agent, "UA-1");
        assert_eq!(records[1].1.user_agent, "UA-\u{fffd}");
        assert_eq!(records[2].1.user_agent, "UA-3");
    }

    #[test]
    fn test_missing_file() {
        let result = LogSource::records("/this/file/does/not/exist.log");
        assert!(matches!(result, Err(SourceError::Open { .. })));
    }
}
