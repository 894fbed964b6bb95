//! The live pacing engine replays one log file as if its visits were
//! happening right now, keeping the original spacing between requests.
//!
//! The engine never sleeps. Each [`LiveReplay::tick`] sends the records that
//! are due and returns how long the caller should wait before the next tick.
//! [`drive`] is the standard caller loop.
//!
//! Records are compared by time of day only, so a log recorded on any date
//! is replayed on today's date. A record earlier in the day than its
//! predecessor ends the replay: it is taken to belong to the next day.

use std::cmp::Ordering;
use std::path::Path;
use std::time::Duration;

use chrono::{Local, NaiveDate};

use crate::auth::AuthToken;
use crate::config::{DaySelection, ReplayConfig};
use crate::day_of_month::{days_present, find_day_of_month_to_use};
use crate::dispatch::Dispatcher;
use crate::error::{ConfigError, Error};
use crate::record::LogRecord;
use crate::request::{build_request_query, LanguageRotation, RequestParams, TrackingRequest};
use crate::site_id::SiteId;
use crate::source::LogSource;

/// A log record with its parsed timestamp.
#[derive(Debug, Clone)]
struct TimedRecord {
    /// The record to replay.
    record: LogRecord,

    /// Day of the month the record was logged on.
    day_of_month: u32,

    /// Seconds since midnight at which the record was logged.
    time_of_day: u32,
}

impl TimedRecord {
    /// Returns [`None`] for records whose timestamp can't be parsed.
    fn new(record: LogRecord) -> Option<Self> {
        let day_of_month = record.day_of_month()?;
        let time_of_day = record.time_of_day()?;
        Some(TimedRecord {
            record,
            day_of_month,
            time_of_day,
        })
    }
}

/// The result of one [`LiveReplay::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Number of requests attempted during the tick. [`None`] if the replay
    /// had nothing left to send.
    pub tracked: Option<usize>,

    /// Number of attempted requests that failed.
    pub failed: usize,

    /// How long to wait before the next tick. [`None`] once the replay is
    /// finished.
    pub wait: Option<Duration>,
}

impl Tick {
    /// The tick of a replay with nothing left to send.
    const NOTHING_TO_TRACK: Tick = Tick {
        tracked: None,
        failed: 0,
        wait: None,
    };

    /// Returns `true` if no further tick is needed.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.wait.is_none()
    }
}

/// The state of a [`LiveReplay`] between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    /// The next tick sends requests.
    Ready,

    /// The next tick returns the time to wait before the first record is due.
    Waiting,

    /// Nothing is left to send. The log file has been released.
    Exhausted,
}

/// Replays a single log file in real time.
pub struct LiveReplay<D> {
    /// The records left to replay.
    source: LogSource<TimedRecord>,

    /// The site receiving the visits.
    site_id: SiteId,

    /// The tracker endpoint receiving the requests.
    endpoint: String,

    /// Timeout of every request.
    timeout: Duration,

    /// The auth token, requested on first use.
    token_auth: AuthToken,

    /// Accept-Language values, one per request sent.
    languages: LanguageRotation,

    /// Wait before the first record, returned by the first tick.
    initial_wait: Option<Duration>,

    /// Delivers the requests.
    dispatcher: D,

    /// Returns the date the visits are replayed on.
    replay_date: fn() -> NaiveDate,
}

/// Returns the current local date.
fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl<D: Dispatcher> LiveReplay<D> {
    /// Opens `log_file` and positions the replay on the first record logged
    /// in the time of day window of `config`.
    ///
    /// The window starts at `config.time_of_day()` and is
    /// `config.time_of_day_delta()` seconds wide, both ends included. If no
    /// record falls in the window the replay is exhausted from the start.
    ///
    /// # Arguments
    ///
    /// - `log_file`: The log file to replay.
    /// - `config`: The replay configuration.
    /// - `dispatcher`: Delivers the tracking requests.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if `log_file` doesn't exist or can't be read.
    pub fn new(log_file: &Path, config: &ReplayConfig, dispatcher: D) -> Result<Self, Error> {
        if !log_file.is_file() {
            return Err(ConfigError::LogFileNotFound(log_file.to_path_buf()).into());
        }

        let day_of_month = match config.day_selection() {
            DaySelection::All => None,
            DaySelection::Exact(day_of_month) => Some(day_of_month),
            DaySelection::Nearest(target) => {
                let days = days_present(LogSource::records(log_file)?.map(|(_, record)| record));
                Some(find_day_of_month_to_use(target, |day| days.contains(&day)))
            }
        };
        tracing::debug!(log_file = %log_file.display(), ?day_of_month, "Opening log file");

        let mut builder = LogSource::records_builder(log_file).filter_map(|line_number, record| {
            let timed = TimedRecord::new(record);
            if timed.is_none() {
                tracing::debug!(line_number, "Skipping log record with invalid timestamp");
            }
            timed
        });
        if let Some(day_of_month) = day_of_month {
            builder = builder.filter(move |_, timed| timed.day_of_month == day_of_month);
        }
        let mut source = builder.open()?;

        let start = config.time_of_day();
        let delta = config.time_of_day_delta();
        let mut initial_wait = None;
        while let Some(timed) = source.current() {
            let offset = timed
                .time_of_day
                .checked_sub(start)
                .filter(|offset| *offset <= delta);
            if let Some(offset) = offset {
                initial_wait = Some(offset);
                break;
            }
            source.advance();
        }
        if initial_wait.is_none() {
            tracing::info!(log_file = %log_file.display(), "No log record in the time of day window");
            source.close();
        }

        Ok(LiveReplay {
            source,
            site_id: config.site_id(),
            endpoint: config.collector().tracker_endpoint().to_string(),
            timeout: config.timeout(),
            token_auth: AuthToken::new(config.token_auth().clone()),
            languages: LanguageRotation::default(),
            initial_wait: initial_wait
                .filter(|offset| *offset > 0)
                .map(|offset| Duration::from_secs(offset.into())),
            dispatcher,
            replay_date: local_today,
        })
    }

    /// Replaces the source of the replay date, today's local date by default.
    #[must_use]
    pub fn with_replay_date_source(mut self, replay_date: fn() -> NaiveDate) -> Self {
        self.replay_date = replay_date;
        self
    }

    /// Sends the records that are due and returns how long to wait before the
    /// next tick.
    ///
    /// - An exhausted replay returns no count and no wait.
    /// - The first tick of a replay starting before its first record returns
    ///   a count of 0 and the time left until that record.
    /// - Otherwise the current record is sent, along with every following
    ///   record logged at the same second. The wait is the gap to the next
    ///   record. There is no wait once the log runs out or the next record is
    ///   earlier in the day.
    ///
    /// Failed requests are not retried. They count as attempted and are also
    /// reported in [`Tick::failed`].
    pub fn tick(&mut self) -> Tick {
        if self.state() == ReplayState::Exhausted {
            return Tick::NOTHING_TO_TRACK;
        }
        if let Some(initial_wait) = self.initial_wait.take() {
            return Tick {
                tracked: Some(0),
                failed: 0,
                wait: Some(initial_wait),
            };
        }

        let mut tracked = 0;
        let mut failed = 0;
        let wait = loop {
            let Some(current) = self.source.current().cloned() else {
                break None;
            };
            if let Err(error) = self.track(&current.record) {
                tracing::warn!(
                    line_number = self.source.line_number(),
                    %error,
                    "Failed to send tracking request"
                );
                failed += 1;
            }
            tracked += 1;

            self.source.advance();
            let Some(next) = self.source.current() else {
                break None;
            };
            match next.time_of_day.cmp(&current.time_of_day) {
                Ordering::Greater => {
                    break Some(Duration::from_secs(
                        (next.time_of_day - current.time_of_day).into(),
                    ));
                }
                Ordering::Equal => {}
                Ordering::Less => {
                    tracing::debug!(
                        line_number = self.source.line_number(),
                        "Log record earlier in the day than its predecessor, ending replay"
                    );
                    break None;
                }
            }
        };

        if wait.is_none() {
            self.close();
        }
        Tick {
            tracked: Some(tracked),
            failed,
            wait,
        }
    }

    /// Sends one record to the collector.
    fn track(&mut self, record: &LogRecord) -> Result<(), Error> {
        let token_auth = self.token_auth.resolve()?;
        let params = RequestParams {
            site_id: self.site_id,
            replay_date: (self.replay_date)(),
            token_auth,
        };
        let body = build_request_query(record, &params)?;
        let request = TrackingRequest::post(
            self.endpoint.clone(),
            body,
            &record.user_agent,
            self.languages.next_language(),
        );
        self.dispatcher.send(&request, self.timeout)?;
        Ok(())
    }

    /// Returns the state of the replay.
    #[must_use]
    pub fn state(&self) -> ReplayState {
        if !self.source.valid() {
            ReplayState::Exhausted
        } else if self.initial_wait.is_some() {
            ReplayState::Waiting
        } else {
            ReplayState::Ready
        }
    }

    /// Returns the line number of the next record to send.
    #[must_use]
    pub fn current_line_number(&self) -> Option<usize> {
        self.source.line_number()
    }

    /// Releases the log file. The replay is exhausted afterwards.
    pub fn close(&mut self) {
        self.initial_wait = None;
        self.source.close();
    }
}

/// How a [`drive`] loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveOutcome {
    /// No record of the log was eligible.
    NothingToTrack,

    /// Every eligible record was sent.
    OutOfLogs {
        /// Requests attempted.
        tracked: usize,
        /// Requests that failed.
        failed: usize,
    },

    /// The next wait would have exceeded the time budget.
    StopAfterReached {
        /// Requests attempted.
        tracked: usize,
        /// Requests that failed.
        failed: usize,
    },
}

/// Ticks `replay` until it is exhausted or the time budget `stop_after` is
/// used.
///
/// The elapsed time is read from `clock`, so the time spent sending requests
/// counts as well as the waits. The budget is checked before sleeping, against
/// the end of the next wait, and again after waking up. `on_tick` is called
/// after every tick, before sleeping. The replay is closed on every exit path.
///
/// # Arguments
///
/// - `replay`: The replay to drive.
/// - `stop_after`: The time budget, unlimited if [`None`].
/// - `clock`: Returns a monotonic reading of the current time, e.g.
///   `|| started.elapsed()` for some `started: Instant`.
/// - `sleep`: Blocks for the given duration.
/// - `on_tick`: Progress callback.
pub fn drive<D, C, S, F>(
    replay: &mut LiveReplay<D>,
    stop_after: Option<Duration>,
    mut clock: C,
    mut sleep: S,
    mut on_tick: F,
) -> LiveOutcome
where
    D: Dispatcher,
    C: FnMut() -> Duration,
    S: FnMut(Duration),
    F: FnMut(&Tick),
{
    let mut tracked = 0;
    let mut failed = 0;
    let started = clock();
    let mut elapsed = || clock().saturating_sub(started);
    let mut first_tick = true;

    loop {
        let tick = replay.tick();
        on_tick(&tick);

        let Some(count) = tick.tracked else {
            replay.close();
            return if first_tick {
                LiveOutcome::NothingToTrack
            } else {
                LiveOutcome::OutOfLogs { tracked, failed }
            };
        };
        first_tick = false;
        tracked += count;
        failed += tick.failed;

        let Some(wait) = tick.wait else {
            replay.close();
            return LiveOutcome::OutOfLogs { tracked, failed };
        };
        if stop_after.is_some_and(|stop_after| elapsed() + wait > stop_after) {
            replay.close();
            return LiveOutcome::StopAfterReached { tracked, failed };
        }

        sleep(wait);

        if stop_after.is_some_and(|stop_after| elapsed() > stop_after) {
            replay.close();
            return LiveOutcome::StopAfterReached { tracked, failed };
        }
    }
}
