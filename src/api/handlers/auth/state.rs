//! Auth configuration and shared per-process state.

use secrecy::SecretString;
use std::sync::Arc;

use super::lockout::{LockoutTracker, DEFAULT_LOCKOUT_THRESHOLD, DEFAULT_LOCKOUT_WINDOW_SECONDS};
use super::password::PasswordHasher;
use super::session::SessionRegistry;
use super::storage::PrincipalDirectory;
use super::token::TokenSigner;
use crate::store::CounterStore;

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 600;

/// Tuning knobs supplied at process start and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    token_ttl_seconds: i64,
    lockout_threshold: u64,
    lockout_window_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_window_seconds: DEFAULT_LOCKOUT_WINDOW_SECONDS,
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_lockout_threshold(mut self, threshold: u64) -> Self {
        self.lockout_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_lockout_window_seconds(mut self, seconds: u64) -> Self {
        self.lockout_window_seconds = seconds;
        self
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn lockout_threshold(&self) -> u64 {
        self.lockout_threshold
    }

    #[must_use]
    pub fn lockout_window_seconds(&self) -> u64 {
        self.lockout_window_seconds
    }
}

/// Everything the auth handlers share: the signer, the directory seam, and
/// the two counter-store consumers (lockout tracker, session registry).
pub struct AuthState {
    config: AuthConfig,
    signer: TokenSigner,
    directory: Arc<dyn PrincipalDirectory>,
    lockout: LockoutTracker,
    sessions: SessionRegistry,
    hasher: PasswordHasher,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        signing_secret: SecretString,
        directory: Arc<dyn PrincipalDirectory>,
        store: Arc<dyn CounterStore>,
    ) -> Self {
        let signer = TokenSigner::new(signing_secret, config.token_ttl_seconds());
        let lockout = LockoutTracker::new(
            store.clone(),
            config.lockout_threshold(),
            config.lockout_window_seconds(),
        );
        let sessions = SessionRegistry::new(store);
        Self {
            config,
            signer,
            directory,
            lockout,
            sessions,
            hasher: PasswordHasher::new(),
        }
    }

    /// Replace the password hasher (tests use cheaper Argon2 costs).
    #[must_use]
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub(crate) fn lockout(&self) -> &LockoutTracker {
        &self.lockout
    }

    pub(crate) fn directory(&self) -> &dyn PrincipalDirectory {
        self.directory.as_ref()
    }

    pub(crate) fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("config", &self.config)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}
