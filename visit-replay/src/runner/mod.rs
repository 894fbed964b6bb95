//! The module runner contains the code to replay log files against the
//! collector: the batch replayer, sending a whole day of records as fast as
//! the collector accepts them, and the live pacing engine in [`live`].

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use itertools::Itertools;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use walkdir::WalkDir;

use crate::auth::AuthToken;
use crate::config::ReplayConfig;
use crate::day_of_month::find_day_of_month_in_records;
use crate::dispatch::Dispatcher;
use crate::error::{ConfigError, RunnerError};
use crate::record::LogRecord;
use crate::report::{DaySummary, ReplayCount, ReplayReport};
use crate::request::{build_request_url, nth_language, RequestParams, TrackingRequest};
use crate::source::LogSource;
pub use crate::runner::replay_range::ReplayRange;

pub mod live;
pub mod replay_range;

/// Extension of the log files replayed in batch mode.
const LOG_FILE_EXTENSION: &str = "log";

/// Replays every day of `replay_range` and reports how many tracking requests
/// were sent.
///
/// The auth token is resolved once for the whole run.
///
/// # Arguments
///
/// - `replay_range`: The days to replay.
/// - `data_dir`: The directory searched recursively for `*.log` files.
/// - `config`: The replay configuration.
/// - `dispatcher`: Delivers the tracking requests.
///
/// # Errors
///
/// Returns [`Err`] if:
///
/// - `data_dir` doesn't exist or can't be listed.
/// - The auth token can't be obtained.
/// - Any log file can't be opened.
pub fn run_replay<D>(
    replay_range: &ReplayRange,
    data_dir: &Path,
    config: &ReplayConfig,
    dispatcher: &D,
) -> Result<ReplayReport, RunnerError>
where
    D: Dispatcher + Sync,
{
    let started = Instant::now();

    let log_files = discover_log_files(data_dir)?;
    let mut token_auth = AuthToken::new(config.token_auth().clone());
    let token_auth = token_auth.resolve()?;

    let days = replay_range
        .dates()
        .map(|date| replay_log_files(date, &log_files, config, token_auth, dispatcher))
        .collect::<Result<Vec<_>, _>>()?;

    let report = ReplayReport::new(config.site_id(), days, started.elapsed());
    tracing::info!(
        tracked = report.total.tracked,
        failed = report.total.failed,
        requests_per_second = report.requests_per_second,
        "Replay completed"
    );
    Ok(report)
}

/// Replays one day: every log file under `data_dir` is replayed for `date`.
///
/// # Arguments
///
/// - `date`: The date the visits are replayed on. Its day of month also picks
///   the records replayed from each file.
/// - `data_dir`: The directory searched recursively for `*.log` files.
/// - `config`: The replay configuration.
/// - `dispatcher`: Delivers the tracking requests.
///
/// # Errors
///
/// Returns [`Err`] if:
///
/// - `data_dir` doesn't exist or can't be listed.
/// - The auth token can't be obtained.
/// - Any log file can't be opened.
pub fn replay_day<D>(
    date: NaiveDate,
    data_dir: &Path,
    config: &ReplayConfig,
    dispatcher: &D,
) -> Result<DaySummary, RunnerError>
where
    D: Dispatcher + Sync,
{
    let log_files = discover_log_files(data_dir)?;
    let mut token_auth = AuthToken::new(config.token_auth().clone());
    let token_auth = token_auth.resolve()?;
    replay_log_files(date, &log_files, config, token_auth, dispatcher)
}

/// Lists the `*.log` files under `data_dir`, recursively, sorted by path.
/// Symbolic links are not followed.
///
/// # Errors
///
/// Returns [`Err`] if `data_dir` doesn't exist or any directory below it
/// can't be read.
pub fn discover_log_files(data_dir: &Path) -> Result<Vec<PathBuf>, RunnerError> {
    if !data_dir.is_dir() {
        return Err(ConfigError::DataDirNotFound(data_dir.to_path_buf()).into());
    }

    let mut log_files = Vec::new();
    for entry in WalkDir::new(data_dir) {
        let entry = entry.map_err(|error| RunnerError::DataDir {
            path: error.path().unwrap_or(data_dir).to_path_buf(),
            source: error.into(),
        })?;
        if entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|extension| extension == LOG_FILE_EXTENSION)
        {
            log_files.push(entry.into_path());
        }
    }

    Ok(log_files.into_iter().sorted().collect())
}

/// Replays `log_files` in parallel for `date`. Each file is replayed
/// sequentially.
///
/// # Errors
///
/// Returns [`Err`] if any log file can't be opened.
fn replay_log_files<D>(
    date: NaiveDate,
    log_files: &[PathBuf],
    config: &ReplayConfig,
    token_auth: &str,
    dispatcher: &D,
) -> Result<DaySummary, RunnerError>
where
    D: Dispatcher + Sync,
{
    tracing::info!(%date, files = log_files.len(), "Replaying day");

    let count = log_files
        .par_iter()
        .map(|log_file| replay_file(log_file, date, config, token_auth, dispatcher))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .sum();

    Ok(DaySummary {
        date,
        files: log_files.len(),
        count,
    })
}

/// Replays the records of one log file.
///
/// The day of month replayed is the one closest to `date` among the days
/// present in the file. A request which can't be built or delivered is
/// logged and counted as failed; the replay carries on with the next record.
///
/// # Errors
///
/// Returns [`Err`] if the log file can't be opened.
fn replay_file<D: Dispatcher>(
    log_file: &Path,
    date: NaiveDate,
    config: &ReplayConfig,
    token_auth: &str,
    dispatcher: &D,
) -> Result<ReplayCount, RunnerError> {
    let records: Vec<LogRecord> = LogSource::records(log_file)?
        .map(|(_, record)| record)
        .collect();

    let day_of_month = find_day_of_month_in_records(date, &records);
    let params = RequestParams {
        site_id: config.site_id(),
        replay_date: date,
        token_auth,
    };
    let endpoint = config.collector().tracker_endpoint().as_str();

    let mut count = ReplayCount::default();
    let matching = records
        .iter()
        .filter(|record| record.day_of_month() == Some(day_of_month));
    for (index, record) in matching.enumerate() {
        let url = match build_request_url(record, &params, endpoint) {
            Ok(url) => url,
            Err(error) => {
                tracing::warn!(file = %log_file.display(), %error, "Skipping log record");
                count.failed += 1;
                continue;
            }
        };
        let request = TrackingRequest::get(url, &record.user_agent, nth_language(index));
        match dispatcher.send(&request, config.timeout()) {
            Ok(()) => count.tracked += 1,
            Err(error) => {
                tracing::warn!(file = %log_file.display(), %error, "Failed to send tracking request");
                count.failed += 1;
            }
        }
    }

    tracing::info!(
        file = %log_file.display(),
        day_of_month,
        tracked = count.tracked,
        failed = count.failed,
        "Replayed log file"
    );
    Ok(count)
}
