//! # Gardi (Abuse Protection & Authentication)
//!
//! `gardi` is an HTTP backend whose core is a distributed abuse-protection
//! subsystem built on a shared atomic counter store (Redis):
//!
//! - **Throttle guard:** per-route request admission with fixed windows,
//!   fail-closed when the store is unreachable.
//! - **Brute-force lockout:** failed signin attempts per principal are
//!   counted in a 10-minute window; five failures lock the account until
//!   the window lapses.
//! - **Single active session:** issuing a token overwrites the principal's
//!   session slot, so a second signin silently revokes the first token
//!   without any blacklist.
//!
//! All three share one primitive: `INCR` a namespaced key and set its TTL
//! only when the returned count is 1. Correctness under concurrent requests
//! from many processes relies entirely on the store's atomic increment;
//! no in-process locks are taken.
//!
//! Namespaces are disjoint by construction: `throttle:<profile>:<client>`,
//! `lockout:<principal>`, `session:<principal>`.

pub mod api;
pub mod cli;
pub mod store;
pub mod throttle;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
