//! The goal of these tests is to replay access logs with the live pacing
//! engine without waiting in real time. Requests are captured by a recording
//! `Dispatcher` and the waits returned by the engine advance a simulated clock
//! instead of being slept. The tests succeed if the records are sent with
//! their original spacing.

#![cfg(test)]

use std::cell::Cell;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::NamedTempFile;
use visit_replay::auth::{TokenAuth, TokenSource};
use visit_replay::config::{Collector, ReplayConfig};
use visit_replay::dispatch::Dispatcher;
use visit_replay::error::{DispatchError, TokenError};
use visit_replay::request::{Method, TrackingRequest};
use visit_replay::runner::live::{drive, LiveOutcome, LiveReplay, ReplayState, Tick};
use visit_replay::site_id::SiteId;

#[derive(Default)]
struct RecordingDispatcher {
    requests: Mutex<Vec<TrackingRequest>>,
}

impl Dispatcher for RecordingDispatcher {
    fn send(&self, request: &TrackingRequest, _: Duration) -> Result<(), DispatchError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Takes `delay` of simulated time to deliver each request.
struct SlowDispatcher<'a> {
    now: &'a Cell<Duration>,
    delay: Duration,
    sent: Cell<usize>,
}

impl Dispatcher for SlowDispatcher<'_> {
    fn send(&self, _: &TrackingRequest, _: Duration) -> Result<(), DispatchError> {
        self.now.set(self.now.get() + self.delay);
        self.sent.set(self.sent.get() + 1);
        Ok(())
    }
}

struct FailingTokenSource;

impl TokenSource for FailingTokenSource {
    fn request_token(&self) -> Result<String, TokenError> {
        Err(TokenError::Empty)
    }
}

/// Formats a log line for a request logged on the 22nd at `time_of_day`.
fn log_line(time_of_day: u32) -> String {
    format!(
        r#"10.0.0.{} - - [22/Mar/2024:{:02}:{:02}:{:02} +0000] "GET /matomo.php?idsite=1&rec=1 HTTP/1.1" 200 43 "-" "UA""#,
        time_of_day % 250,
        time_of_day / 3600,
        time_of_day / 60 % 60,
        time_of_day % 60,
    )
}

fn log_file(times_of_day: &[u32]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for time_of_day in times_of_day {
        writeln!(file, "{}", log_line(*time_of_day)).unwrap();
    }
    file
}

fn config() -> ReplayConfig {
    ReplayConfig::new(
        SiteId::new(1).unwrap(),
        Collector::new("http://localhost").unwrap(),
        TokenAuth::Fixed("token".to_string()),
    )
}

fn tick(tracked: Option<usize>, wait: Option<u64>) -> Tick {
    Tick {
        tracked,
        failed: 0,
        wait: wait.map(Duration::from_secs),
    }
}

#[test]
fn test_skip_ahead_and_pacing() {
    let file = log_file(&[100, 500]);
    let dispatcher = RecordingDispatcher::default();
    let mut replay = LiveReplay::new(file.path(), &config(), &dispatcher).unwrap();

    assert_eq!(replay.tick(), tick(Some(0), Some(100)));
    assert_eq!(replay.tick(), tick(Some(1), Some(400)));
    assert_eq!(replay.tick(), tick(Some(1), None));
    assert_eq!(replay.tick(), tick(None, None));

    let requests = dispatcher.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|request| request.method == Method::Post));
}

#[test]
fn test_single_record() {
    let file = log_file(&[0]);
    let mut replay = LiveReplay::new(file.path(), &config(), RecordingDispatcher::default()).unwrap();

    assert_eq!(replay.tick(), tick(Some(1), None));
    assert_eq!(replay.state(), ReplayState::Exhausted);
    assert_eq!(replay.tick(), tick(None, None));
}

#[test]
fn test_waits_follow_log_spacing() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut times_of_day: Vec<u32> = (0..200).map(|_| rng.gen_range(1..86_400)).collect();
    times_of_day.sort_unstable();
    let file = log_file(&times_of_day);

    let dispatcher = RecordingDispatcher::default();
    let mut replay = LiveReplay::new(file.path(), &config(), &dispatcher).unwrap();
    let now = Cell::new(Duration::ZERO);
    let outcome = drive(
        &mut replay,
        None,
        || now.get(),
        |wait| now.set(now.get() + wait),
        |_| {},
    );

    assert_eq!(
        outcome,
        LiveOutcome::OutOfLogs {
            tracked: times_of_day.len(),
            failed: 0
        }
    );
    let last = times_of_day[times_of_day.len() - 1];
    assert_eq!(now.get(), Duration::from_secs(last.into()));
    assert_eq!(dispatcher.requests.lock().unwrap().len(), times_of_day.len());
}

#[test]
fn test_stop_after() {
    let file = log_file(&[100, 500, 900]);
    let mut replay = LiveReplay::new(file.path(), &config(), RecordingDispatcher::default()).unwrap();
    let mut ticks = Vec::new();
    let now = Cell::new(Duration::ZERO);

    let outcome = drive(
        &mut replay,
        Some(Duration::from_secs(450)),
        || now.get(),
        |wait| now.set(now.get() + wait),
        |tick| ticks.push(*tick),
    );

    assert_eq!(
        outcome,
        LiveOutcome::StopAfterReached {
            tracked: 1,
            failed: 0
        }
    );
    assert_eq!(ticks, vec![tick(Some(0), Some(100)), tick(Some(1), Some(400))]);
    assert_eq!(replay.state(), ReplayState::Exhausted);
}

#[test]
fn test_stop_after_counts_dispatch_time() {
    let file = log_file(&[1, 2, 3, 4]);
    let now = Cell::new(Duration::ZERO);
    let dispatcher = SlowDispatcher {
        now: &now,
        delay: Duration::from_millis(1500),
        sent: Cell::new(0),
    };
    let mut replay = LiveReplay::new(file.path(), &config(), &dispatcher).unwrap();

    let outcome = drive(
        &mut replay,
        Some(Duration::from_secs(2)),
        || now.get(),
        |wait| now.set(now.get() + wait),
        |_| {},
    );

    // Sending the first record ends at 2.5 s, so the 1 s wait for the second
    // one is over budget.
    assert_eq!(
        outcome,
        LiveOutcome::StopAfterReached {
            tracked: 1,
            failed: 0
        }
    );
    assert_eq!(dispatcher.sent.get(), 1);
    assert_eq!(now.get(), Duration::from_millis(2500));
}

#[test]
fn test_stop_after_is_checked_after_sleeping() {
    let file = log_file(&[1, 2]);
    let now = Cell::new(Duration::ZERO);
    let dispatcher = RecordingDispatcher::default();
    let mut replay = LiveReplay::new(file.path(), &config(), &dispatcher).unwrap();

    // Every sleep overshoots by 2 s.
    let outcome = drive(
        &mut replay,
        Some(Duration::from_secs(2)),
        || now.get(),
        |wait| now.set(now.get() + wait + Duration::from_secs(2)),
        |_| {},
    );

    assert_eq!(
        outcome,
        LiveOutcome::StopAfterReached {
            tracked: 0,
            failed: 0
        }
    );
    assert!(dispatcher.requests.lock().unwrap().is_empty());
    assert_eq!(replay.state(), ReplayState::Exhausted);
}

#[test]
fn test_nothing_to_track() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "##### YOU CAN REPLACE THIS FILE WITH YOUR OWN LOGS").unwrap();
    let mut replay = LiveReplay::new(file.path(), &config(), RecordingDispatcher::default()).unwrap();

    let outcome = drive(
        &mut replay,
        None,
        || Duration::ZERO,
        |_| panic!("Nothing to wait for"),
        |_| {},
    );

    assert_eq!(outcome, LiveOutcome::NothingToTrack);
}

#[test]
fn test_failed_attempts_are_counted() {
    let file = log_file(&[0, 0, 10]);
    let config = ReplayConfig::new(
        SiteId::new(1).unwrap(),
        Collector::new("http://localhost").unwrap(),
        TokenAuth::Requested(Arc::new(FailingTokenSource)),
    );
    let dispatcher = RecordingDispatcher::default();
    let mut replay = LiveReplay::new(file.path(), &config, &dispatcher).unwrap();

    let tick = replay.tick();
    assert_eq!(tick.tracked, Some(2));
    assert_eq!(tick.failed, 2);
    assert_eq!(tick.wait, Some(Duration::from_secs(10)));
    assert!(dispatcher.requests.lock().unwrap().is_empty());
}
