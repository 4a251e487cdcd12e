//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{auth, throttle};
use anyhow::{Context, Result, anyhow};
use url::Url;

/// Reject malformed or wrong-scheme connection URLs before any dial attempt.
fn require_scheme(value: &str, arg: &str, allowed: &[&str]) -> Result<()> {
    let parsed =
        Url::parse(value).with_context(|| format!("invalid --{arg} URL: {value}"))?;
    if allowed.contains(&parsed.scheme()) {
        Ok(())
    } else {
        Err(anyhow!(
            "--{arg} must use {} scheme, got {}",
            allowed.join(" or "),
            parsed.scheme()
        ))
    }
}

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let store_url = matches
        .get_one::<String>("store-url")
        .cloned()
        .context("missing required argument: --store-url")?;
    require_scheme(&dsn, "dsn", &["postgres", "postgresql"])?;
    require_scheme(&store_url, "store-url", &["redis", "rediss"])?;
    let store_timeout_seconds = matches
        .get_one::<u64>("store-timeout-seconds")
        .copied()
        .unwrap_or(2);

    let auth_opts = auth::Options::parse(matches)?;
    let throttle_opts = throttle::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        store_url,
        store_timeout_seconds,
        auth_secret: auth_opts.secret,
        token_ttl_seconds: auth_opts.token_ttl_seconds,
        lockout_threshold: auth_opts.lockout_threshold,
        lockout_window_seconds: auth_opts.lockout_window_seconds,
        throttle_limit: throttle_opts.limit,
        throttle_window_seconds: throttle_opts.window_seconds,
        throttle_block_duration_seconds: throttle_opts.block_duration_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_secret_required() {
        temp_env::with_vars(
            [
                ("GARDI_AUTH_SECRET", None::<&str>),
                ("GARDI_DSN", Some("postgres://user@localhost:5432/gardi")),
            ],
            || {
                let command = crate::cli::commands::new();
                let result = command.try_get_matches_from(vec!["gardi"]);
                // clap enforces the argument before dispatch runs
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn full_configuration_maps_to_server_args() {
        temp_env::with_vars(
            [
                ("GARDI_DSN", Some("postgres://user@localhost:5432/gardi")),
                ("GARDI_AUTH_SECRET", Some("a-development-signing-secret")),
                ("GARDI_STORE_URL", Some("redis://cache.internal:6379")),
                ("GARDI_THROTTLE_LIMIT", Some("7")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["gardi"]);
                let action = handler(&matches).unwrap();
                let Action::Server(args) = action;
                assert_eq!(args.port, 8080);
                assert_eq!(args.store_url, "redis://cache.internal:6379");
                assert_eq!(args.store_timeout_seconds, 2);
                assert_eq!(args.token_ttl_seconds, 600);
                assert_eq!(args.lockout_threshold, 5);
                assert_eq!(args.throttle_limit, 7);
                assert_eq!(args.throttle_window_seconds, 60);
            },
        );
    }

    #[test]
    fn wrong_store_scheme_is_rejected() {
        temp_env::with_vars(
            [
                ("GARDI_DSN", Some("postgres://user@localhost:5432/gardi")),
                ("GARDI_AUTH_SECRET", Some("a-development-signing-secret")),
                ("GARDI_STORE_URL", Some("http://cache.internal:6379")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["gardi"]);
                let result = handler(&matches);
                let err = result.unwrap_err().to_string();
                assert!(err.contains("--store-url"), "unexpected error: {err}");
            },
        );
    }

    #[test]
    fn malformed_dsn_is_rejected() {
        temp_env::with_vars(
            [
                ("GARDI_DSN", Some("not a url at all")),
                ("GARDI_AUTH_SECRET", Some("a-development-signing-secret")),
                ("GARDI_STORE_URL", Some("redis://cache.internal:6379")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["gardi"]);
                let result = handler(&matches);
                let err = result.unwrap_err().to_string();
                assert!(err.contains("--dsn"), "unexpected error: {err}");
            },
        );
    }
}
