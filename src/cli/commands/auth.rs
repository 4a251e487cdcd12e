use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("auth-secret")
                .long("auth-secret")
                .help("Token signing secret")
                .env("GARDI_AUTH_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("token-ttl-seconds")
                .long("token-ttl-seconds")
                .help("Access token TTL in seconds")
                .env("GARDI_TOKEN_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("lockout-threshold")
                .long("lockout-threshold")
                .help("Failed signins before a principal is locked")
                .env("GARDI_LOCKOUT_THRESHOLD")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("lockout-window-seconds")
                .long("lockout-window-seconds")
                .help("Failure counting window in seconds")
                .env("GARDI_LOCKOUT_WINDOW_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub secret: SecretString,
    pub token_ttl_seconds: i64,
    pub lockout_threshold: u64,
    pub lockout_window_seconds: u64,
}

impl Options {
    /// Collect auth options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let secret = matches
            .get_one::<String>("auth-secret")
            .cloned()
            .context("missing required argument: --auth-secret")?;

        Ok(Self {
            secret: SecretString::from(secret),
            token_ttl_seconds: matches
                .get_one::<i64>("token-ttl-seconds")
                .copied()
                .unwrap_or(600),
            lockout_threshold: matches
                .get_one::<u64>("lockout-threshold")
                .copied()
                .unwrap_or(5),
            lockout_window_seconds: matches
                .get_one::<u64>("lockout-window-seconds")
                .copied()
                .unwrap_or(600),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_apply() {
        let command = crate::cli::commands::new();
        let matches = command.get_matches_from(vec![
            "gardi",
            "--dsn",
            "postgres://localhost/gardi",
            "--auth-secret",
            "a-development-signing-secret",
        ]);
        let options = Options::parse(&matches).unwrap();
        assert_eq!(
            options.secret.expose_secret(),
            "a-development-signing-secret"
        );
        assert_eq!(options.token_ttl_seconds, 600);
        assert_eq!(options.lockout_threshold, 5);
        assert_eq!(options.lockout_window_seconds, 600);
    }

    #[test]
    fn overrides_apply() {
        let command = crate::cli::commands::new();
        let matches = command.get_matches_from(vec![
            "gardi",
            "--dsn",
            "postgres://localhost/gardi",
            "--auth-secret",
            "a-development-signing-secret",
            "--token-ttl-seconds",
            "1200",
            "--lockout-threshold",
            "3",
            "--lockout-window-seconds",
            "120",
        ]);
        let options = Options::parse(&matches).unwrap();
        assert_eq!(options.token_ttl_seconds, 1200);
        assert_eq!(options.lockout_threshold, 3);
        assert_eq!(options.lockout_window_seconds, 120);
    }
}
