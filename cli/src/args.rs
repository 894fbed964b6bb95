//! This file contains the structure of command line arguments supported by the
//! tool.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// This is the struct of the command line arguments accepted by
/// `visit-replay`.
#[derive(Clone, Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// The operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// The operations of `visit-replay`.
#[derive(Clone, Subcommand, Debug)]
pub enum Command {
    /// Replays one day of every log file in a directory as fast as possible.
    GenerateVisits(GenerateVisitsArgs),

    /// Replays a log file in real time, starting at the current time of day.
    GenerateLiveVisits(GenerateLiveVisitsArgs),

    /// Keeps a limited number of lines per day of a log file and prints them.
    ShortenLog(ShortenLogArgs),

    /// Removes ips and domains from a log file.
    AnonymizeLog(AnonymizeLogArgs),
}

/// Options shared by the replay commands.
#[derive(Clone, clap::Args, Debug)]
pub struct CollectorArgs {
    /// The id of the site receiving the visits.
    #[arg(long)]
    pub idsite: u32,

    /// The base url of the analytics collector, e.g. `http://localhost/`.
    #[arg(long, env = "VISIT_REPLAY_COLLECTOR_URL")]
    pub collector_url: String,

    /// Timeout in seconds of each tracking request.
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// How the auth token is obtained.
    #[command(flatten)]
    pub token: TokenArgs,
}

/// The auth token sent with every request. Exactly one option is needed.
#[derive(Clone, clap::Args, Debug)]
#[group(required = true, multiple = false)]
pub struct TokenArgs {
    /// The auth token accepted by the collector.
    #[arg(long, env = "VISIT_REPLAY_TOKEN_AUTH", hide_env_values = true)]
    pub token_auth: Option<String>,

    /// A shell command printing an auth token, run once per replay.
    #[arg(long)]
    pub token_command: Option<String>,
}

/// Arguments of `generate-visits`.
#[derive(Clone, clap::Args, Debug)]
pub struct GenerateVisitsArgs {
    /// Shared replay options.
    #[command(flatten)]
    pub collector: CollectorArgs,

    /// The number of days to replay, ending with `end_date`.
    #[arg(long, default_value_t = 1)]
    pub days: u32,

    /// The last day to replay. Defaults to today.
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// The directory searched recursively for `*.log` files.
    #[arg(long)]
    pub data_dir: PathBuf,

    /// The filename to output the JSON report of the replay.
    ///
    /// If `None`, output file is skipped.
    #[arg(long)]
    pub report_out: Option<PathBuf>,

    /// Set to overwrite `report_out` if it already exists.
    #[arg(long)]
    pub overwrite: bool,
}

/// Arguments of `generate-live-visits`.
#[derive(Clone, clap::Args, Debug)]
pub struct GenerateLiveVisitsArgs {
    /// Shared replay options.
    #[command(flatten)]
    pub collector: CollectorArgs,

    /// The log file to replay.
    #[arg(long)]
    pub log_file: PathBuf,

    /// Only replay records logged on this day of the month. Defaults to
    /// today; 0 replays every day.
    #[arg(long)]
    pub day_of_month: Option<u32>,

    /// Set to replay the day of the month closest to `day_of_month` which is
    /// present in the log.
    #[arg(long)]
    pub nearest_day: bool,

    /// Seconds since midnight at which the replay starts. Defaults to the
    /// current local time.
    #[arg(long)]
    pub time_of_day: Option<u32>,

    /// Stops the replay after this many seconds. The first record must also
    /// fall within this many seconds of `time_of_day`. 0 means no limit.
    #[arg(long)]
    pub stop_after: Option<u32>,
}

/// Arguments of `shorten-log`.
#[derive(Clone, clap::Args, Debug)]
pub struct ShortenLogArgs {
    /// The log file to shorten.
    pub file: PathBuf,

    /// Max number of log lines to keep per day.
    #[arg(long, default_value_t = visit_replay::tools::DEFAULT_LINES_PER_DAY)]
    pub num_lines: usize,

    /// Always keep log lines containing this term. Can be repeated.
    #[arg(long)]
    pub force_keep: Vec<String>,
}

/// Arguments of `anonymize-log`.
#[derive(Clone, clap::Args, Debug)]
pub struct AnonymizeLogArgs {
    /// The log file to anonymize.
    pub file: PathBuf,

    /// The directory receiving the anonymized log.
    #[arg(long)]
    pub out_dir: PathBuf,

    /// Replaces a word before anonymizing, given as `old:new`. Can be
    /// repeated.
    #[arg(long)]
    pub replace: Vec<String>,

    /// Set to overwrite the anonymized log if it already exists.
    #[arg(long)]
    pub overwrite: bool,
}
