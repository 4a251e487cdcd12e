use crate::{
    api,
    api::handlers::auth::AuthConfig,
    throttle::{DEFAULT_PROFILE_NAME, ThrottleProfile},
};
use anyhow::Result;
use secrecy::SecretString;
use std::time::Duration;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub store_url: String,
    pub store_timeout_seconds: u64,
    pub auth_secret: SecretString,
    pub token_ttl_seconds: i64,
    pub lockout_threshold: u64,
    pub lockout_window_seconds: u64,
    pub throttle_limit: u64,
    pub throttle_window_seconds: u64,
    pub throttle_block_duration_seconds: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store or database is unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new()
        .with_token_ttl_seconds(args.token_ttl_seconds)
        .with_lockout_threshold(args.lockout_threshold)
        .with_lockout_window_seconds(args.lockout_window_seconds);

    let profile = ThrottleProfile {
        name: DEFAULT_PROFILE_NAME.to_string(),
        limit: args.throttle_limit,
        window_seconds: args.throttle_window_seconds,
        block_duration_seconds: args.throttle_block_duration_seconds,
    };

    api::new(
        args.port,
        args.dsn,
        args.store_url,
        Duration::from_secs(args.store_timeout_seconds),
        args.auth_secret,
        auth_config,
        profile,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_debug_does_not_leak_the_secret() {
        let args = Args {
            port: 8080,
            dsn: "postgres://localhost/gardi".to_string(),
            store_url: "redis://127.0.0.1:6379".to_string(),
            store_timeout_seconds: 2,
            auth_secret: SecretString::from("a-development-signing-secret"),
            token_ttl_seconds: 600,
            lockout_threshold: 5,
            lockout_window_seconds: 600,
            throttle_limit: 3,
            throttle_window_seconds: 60,
            throttle_block_duration_seconds: 0,
        };
        let debug = format!("{args:?}");
        assert!(!debug.contains("a-development-signing-secret"));
    }
}
