//! Command-line interface for the emitter host.
//!
//! Built with `clap`'s builder API; every flag overrides a value from the
//! configuration file.

use clap::{Arg, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// Every field except `config_path` overrides the matching value from the
/// configuration file when set.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the number of worker threads
    pub workers: Option<usize>,
    /// Optional override for submissions per worker
    pub events_per_worker: Option<usize>,
    /// Keep the loop running until a shutdown signal arrives
    pub wait_for_signal: bool,
}

impl CliArgs {
    /// Parses the process arguments.
    pub fn parse() -> Self {
        Self::from_matches(Self::command().get_matches())
    }

    /// Parses an explicit argument list, first item being the binary name.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(Self::command().try_get_matches_from(args)?))
    }

    fn command() -> Command {
        Command::new("Emitter Host")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Drives a loop-owned event emitter from worker threads")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("emitter.toml"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("workers")
                    .short('w')
                    .long("workers")
                    .value_name("COUNT")
                    .help("Number of worker threads submitting events")
                    .value_parser(clap::value_parser!(usize)),
            )
            .arg(
                Arg::new("events")
                    .short('n')
                    .long("events")
                    .value_name("COUNT")
                    .help("Async emissions submitted by each worker")
                    .value_parser(clap::value_parser!(usize)),
            )
            .arg(
                Arg::new("wait")
                    .long("wait")
                    .help("Keep running after the demo until SIGINT/SIGTERM")
                    .action(clap::ArgAction::SetTrue),
            )
    }

    fn from_matches(matches: clap::ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("emitter.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            workers: matches.get_one::<usize>("workers").copied(),
            events_per_worker: matches.get_one::<usize>("events").copied(),
            wait_for_signal: matches.get_flag("wait"),
        }
    }
}
