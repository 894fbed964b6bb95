//! The library `visit-replay` replays web server access logs against an
//! analytics collector, generating realistic visits for testing and demos.
//!
//! Each logged tracking request is turned into a new request for a chosen
//! site, dated today (or any replay date) at the time of day it was
//! originally logged. Two modes are available:
//!
//! - batch replay with [`run_replay`], sending one day of records from every
//!   log file of a directory as fast as the collector accepts them;
//! - live replay with [`runner::live::LiveReplay`], sending the records of one
//!   log file in real time, keeping their original spacing.
//!
//! The key structs of the library are as follows:
//!
//! - [`record::LogRecord`] struct which holds one parsed access log line.
//! - [`source::LogSource`] struct, a forward-only cursor over the records of
//!   a log file.
//! - [`config::ReplayConfig`] struct which holds the validated parameters of
//!   a replay.
//! - [`ReplayRange`] struct which holds the days of a batch replay.
//!
//! The network is reached only through the [`dispatch::Dispatcher`] trait,
//! implemented for HTTP by [`dispatch::HttpDispatcher`].
//!
//! Beyond the replay itself, the module [`tools`] shortens and anonymizes logs
//! before they are replayed or shared.

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::pedantic,
    clippy::missing_docs_in_private_items
)]

pub use crate::report::write_to_file;
pub use crate::runner::replay_range::ReplayRange;
pub use crate::runner::{replay_day, run_replay};

pub mod auth;
pub mod config;
pub mod day_of_month;
pub mod dispatch;
pub mod error;
pub mod record;
pub mod report;
pub mod request;
pub mod runner;
pub mod site_id;
pub mod source;
pub mod tools;
