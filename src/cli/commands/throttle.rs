use clap::{Arg, Command};

use crate::throttle::{DEFAULT_LIMIT, DEFAULT_WINDOW_SECONDS};

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("throttle-limit")
                .long("throttle-limit")
                .help("Requests admitted per client per window")
                .env("GARDI_THROTTLE_LIMIT")
                .default_value("3")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("throttle-window-seconds")
                .long("throttle-window-seconds")
                .help("Throttle counting window in seconds")
                .env("GARDI_THROTTLE_WINDOW_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("throttle-block-duration-seconds")
                .long("throttle-block-duration-seconds")
                .help("Accepted for compatibility; blocking always ends with the window")
                .env("GARDI_THROTTLE_BLOCK_DURATION_SECONDS")
                .default_value("0")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub limit: u64,
    pub window_seconds: u64,
    pub block_duration_seconds: u64,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &clap::ArgMatches) -> Self {
        Self {
            limit: matches
                .get_one::<u64>("throttle-limit")
                .copied()
                .unwrap_or(DEFAULT_LIMIT),
            window_seconds: matches
                .get_one::<u64>("throttle-window-seconds")
                .copied()
                .unwrap_or(DEFAULT_WINDOW_SECONDS),
            block_duration_seconds: matches
                .get_one::<u64>("throttle-block-duration-seconds")
                .copied()
                .unwrap_or(0),
        }
    }
}
