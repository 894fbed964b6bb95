//! Replay web server access logs against an analytics collector.
//!
//! Sends the tracking requests found in access logs again, dated today, either
//! a whole day at once or in real time. This is only the CLI front-end. All
//! the logic is contained in the library [`visit_replay`].

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use chrono::{Datelike, Local, Timelike};
use clap::Parser;
use exitcode::{CONFIG, OK, SOFTWARE};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use visit_replay::auth::{CommandTokenSource, TokenAuth};
use visit_replay::config::{Collector, DaySelection, ReplayConfig};
use visit_replay::dispatch::HttpDispatcher;
use visit_replay::error::{ConfigError, Error, RunnerError};
use visit_replay::record::SECONDS_IN_DAY;
use visit_replay::runner::live::{drive, LiveOutcome, LiveReplay};
use visit_replay::site_id::SiteId;
use visit_replay::tools::{shorten_log, target_path, Anonymizer, Replacement};
use visit_replay::{run_replay, write_to_file, ReplayRange};

use crate::args::{
    AnonymizeLogArgs,
    Args,
    CollectorArgs,
    Command,
    GenerateLiveVisitsArgs,
    GenerateVisitsArgs,
    ShortenLogArgs,
};

mod args;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .compact()
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => process::exit(OK),
        Err(e) if is_config_error(&e) => {
            eprintln!("Invalid configuration: {e}");
            process::exit(CONFIG);
        }
        Err(e) => {
            eprintln!("Internal software error: {e:#}");
            process::exit(SOFTWARE);
        }
    }
}

/// Returns `true` if `error` was caused by an invalid option value.
fn is_config_error(error: &anyhow::Error) -> bool {
    error.downcast_ref::<ConfigError>().is_some()
        || matches!(
            error.downcast_ref::<RunnerError>(),
            Some(RunnerError::Config(_))
        )
        || matches!(error.downcast_ref::<Error>(), Some(Error::Config(_)))
}

/// Returns an error if the file exists already and can't be overwritten,
///
/// # Arguments
///
/// - `path`: The file to write.
/// - `overwrite`: If `true`, the file can be overwritten.
fn check_file(path: &Option<PathBuf>, overwrite: bool) -> anyhow::Result<()> {
    if let Some(filename) = path {
        if filename.exists() && !overwrite {
            let filename = filename.as_path().display();
            bail!(
                "The file {0:?} exists already. To ignore it, pass the flag --overwrite.",
                filename
            )
        }
    }
    Ok(())
}

/// Take the command line input arguments and run the requested command.
///
/// # Arguments
///
/// - `args`: The list of command line input arguments.
///
/// # Errors
///
/// Returns [`Err`] if the command fails. See the documentation of each
/// command.
fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Command::GenerateVisits(args) => generate_visits(args),
        Command::GenerateLiveVisits(args) => generate_live_visits(args),
        Command::ShortenLog(args) => shorten(args),
        Command::AnonymizeLog(args) => anonymize(args),
    }
}

/// Validates the options shared by the replay commands.
///
/// # Errors
///
/// Returns [`Err`] if the site id, the collector url or the timeout is not
/// valid.
fn replay_config(args: CollectorArgs) -> anyhow::Result<ReplayConfig> {
    let site_id = SiteId::new(args.idsite)?;
    let collector = Collector::new(&args.collector_url)?;
    let token_auth = match (args.token.token_auth, args.token.token_command) {
        (Some(token_auth), _) => TokenAuth::Fixed(token_auth),
        (None, Some(command)) => TokenAuth::Requested(Arc::new(CommandTokenSource::new(command))),
        (None, None) => bail!("Pass either --token-auth or --token-command."),
    };
    Ok(ReplayConfig::new(site_id, collector, token_auth).with_timeout(args.timeout)?)
}

/// Replays one or more days of every log file of the data directory.
///
/// # Errors
///
/// Returns [`Err`] if:
///
/// - Any option is not valid.
/// - `report_out` exists already and `overwrite` is not set.
/// - The data directory or a log file can't be read.
/// - The auth token can't be obtained.
fn generate_visits(args: GenerateVisitsArgs) -> anyhow::Result<()> {
    check_file(&args.report_out, args.overwrite)?;

    let config = replay_config(args.collector)?;
    let end_date = args
        .end_date
        .unwrap_or_else(|| Local::now().date_naive());
    let replay_range = ReplayRange::new(end_date, args.days)?;

    tracing::info!(
        start_date = %replay_range.get_start_date(),
        %end_date,
        collector = %config.collector(),
        "Generating visits"
    );
    let dispatcher = HttpDispatcher::new()?;
    let report = run_replay(&replay_range, &args.data_dir, &config, &dispatcher)?;

    println!(
        "{} requests tracked, {} failed, in {:.1} seconds ({:.1} requests per second)",
        report.total.tracked,
        report.total.failed,
        report.elapsed_seconds,
        report.requests_per_second
    );

    if let Some(filename) = args.report_out {
        write_to_file(&filename, &report)?;
    }

    Ok(())
}

/// Replays a log file in real time until it runs out of records or the
/// `stop_after` budget is used.
///
/// # Errors
///
/// Returns [`Err`] if any option is not valid or the log file can't be read.
fn generate_live_visits(args: GenerateLiveVisitsArgs) -> anyhow::Result<()> {
    let now = Local::now();
    let today = now.date_naive();

    let day_of_month = args.day_of_month.unwrap_or_else(|| today.day());
    let day_selection = match (day_of_month, args.nearest_day) {
        (0, _) => DaySelection::All,
        (day_of_month, true) => DaySelection::Nearest(
            today
                .with_day(day_of_month)
                .ok_or(ConfigError::InvalidDayOfMonth(day_of_month))?,
        ),
        (day_of_month, false) => DaySelection::from_day_of_month(day_of_month)?,
    };
    let time_of_day = args
        .time_of_day
        .unwrap_or_else(|| now.num_seconds_from_midnight());
    let stop_after = stop_after_budget(args.stop_after);
    let time_of_day_delta = stop_after.unwrap_or(SECONDS_IN_DAY);

    let config = replay_config(args.collector)?
        .with_day_selection(day_selection)?
        .with_time_of_day(time_of_day, time_of_day_delta)?;

    let dispatcher = HttpDispatcher::new()?;
    let mut replay = LiveReplay::new(&args.log_file, &config, dispatcher)?;
    tracing::info!(
        log_file = %args.log_file.display(),
        time_of_day,
        ?day_selection,
        line_number = replay.current_line_number(),
        "Starting live replay"
    );

    let stop_after = stop_after.map(|seconds| Duration::from_secs(seconds.into()));
    let started = Instant::now();
    let outcome = drive(
        &mut replay,
        stop_after,
        || started.elapsed(),
        std::thread::sleep,
        |tick| {
            if let Some(tracked) = tick.tracked {
                tracing::info!(
                    tracked,
                    failed = tick.failed,
                    wait = ?tick.wait,
                    "Tracked requests"
                );
            }
        },
    );

    match outcome {
        LiveOutcome::NothingToTrack => println!("No logs to track"),
        LiveOutcome::OutOfLogs { tracked, failed } => {
            println!("Out of logs: {tracked} requests tracked, {failed} failed");
        }
        LiveOutcome::StopAfterReached { tracked, failed } => {
            println!("Stop after reached: {tracked} requests tracked, {failed} failed");
        }
    }
    Ok(())
}

/// Returns the `--stop-after` budget in seconds. `0` means no limit.
fn stop_after_budget(stop_after: Option<u32>) -> Option<u32> {
    stop_after.filter(|seconds| *seconds > 0)
}

/// Prints the shortened log file to standard output.
///
/// # Errors
///
/// Returns [`Err`] if the log file can't be read or standard output can't be
/// written.
fn shorten(args: ShortenLogArgs) -> anyhow::Result<()> {
    if !args.file.is_file() {
        return Err(ConfigError::LogFileNotFound(args.file).into());
    }
    let input = File::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;

    let summary = shorten_log(
        BufReader::new(input),
        io::stdout().lock(),
        args.num_lines,
        &args.force_keep,
    )?;
    tracing::info!(read = summary.read, kept = summary.kept, "Log shortened");
    Ok(())
}

/// Writes the anonymized copy of a log file to the output directory.
///
/// # Errors
///
/// Returns [`Err`] if:
///
/// - A replacement is not of the form `old:new`.
/// - The target file exists already and `overwrite` is not set.
/// - The log file can't be read or the target file can't be written.
fn anonymize(args: AnonymizeLogArgs) -> anyhow::Result<()> {
    if !args.file.is_file() {
        return Err(ConfigError::LogFileNotFound(args.file).into());
    }
    let replacements = args
        .replace
        .iter()
        .map(|pair| pair.parse::<Replacement>())
        .collect::<Result<Vec<_>, _>>()?;

    let target = target_path(&args.out_dir, &args.file);
    check_file(&Some(target.clone()), args.overwrite)?;
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    let input = File::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let output = File::create(&target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    let lines = Anonymizer::new(replacements)
        .anonymize_log(BufReader::new(input), BufWriter::new(output))?;

    println!("Log anonymized and saved in file {} ({lines} lines)", target.display());
    Ok(())
}
