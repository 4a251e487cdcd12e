//! Password hashing with Argon2id.
//!
//! Hashing is CPU-bound, so both operations run under `spawn_blocking` to
//! keep request tasks responsive under concurrent signins.

use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, PasswordHash, Version,
};
use tracing::error;

use super::error::AuthError;

#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    /// OWASP minimum recommended memory cost: 19 MiB.
    const MEMORY_COST: u32 = 19_456;
    const TIME_COST: u32 = 2;
    const PARALLELISM: u32 = 1;
    const OUTPUT_LEN: usize = 32;

    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(
            Self::MEMORY_COST,
            Self::TIME_COST,
            Self::PARALLELISM,
            Some(Self::OUTPUT_LEN),
        )
        .expect("Invalid Argon2 parameters");
        Self { params }
    }

    /// Custom cost parameters, for tests or constrained deployments.
    #[must_use]
    pub fn with_params(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        let params = Params::new(memory_cost, time_cost, parallelism, Some(Self::OUTPUT_LEN))
            .expect("Invalid Argon2 parameters");
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a secret into a PHC-format digest.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if hashing fails or the task panics.
    pub async fn hash(&self, password: String) -> Result<String, AuthError> {
        let argon2 = self.argon2();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await
        .map_err(|err| {
            error!("Password hash task panicked: {err}");
            AuthError::Internal(anyhow!("password hashing failed"))
        })?
        .map_err(|err| {
            error!("Failed to hash password: {err}");
            AuthError::Internal(anyhow!("password hashing failed"))
        })
    }

    /// Verify a secret against a stored digest.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` for malformed digests or task panics;
    /// a plain mismatch is `Ok(false)`.
    pub async fn verify(&self, digest: String, password: String) -> Result<bool, AuthError> {
        let argon2 = self.argon2();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&digest)
                .map_err(|err| anyhow!("stored digest is malformed: {err}"))?;
            match argon2.verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(err) => Err(anyhow!("password verification failed: {err}")),
            }
        })
        .await
        .map_err(|err| {
            error!("Password verify task panicked: {err}");
            AuthError::Internal(anyhow!("password verification failed"))
        })?
        .map_err(AuthError::Internal)
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_hasher() -> PasswordHasher {
        // Minimum legal costs so the test suite stays fast.
        PasswordHasher::with_params(8, 1, 1)
    }

    #[tokio::test]
    async fn hash_then_verify_accepts_the_secret() {
        let hasher = cheap_hasher();
        let digest = hasher.hash("hunter2hunter2".to_string()).await.unwrap();
        assert!(hasher
            .verify(digest, "hunter2hunter2".to_string())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn wrong_secret_is_a_clean_mismatch() {
        let hasher = cheap_hasher();
        let digest = hasher.hash("correct-horse".to_string()).await.unwrap();
        assert!(!hasher
            .verify(digest, "battery-staple".to_string())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn malformed_digest_is_an_internal_error() {
        let hasher = cheap_hasher();
        let result = hasher
            .verify("not-a-phc-string".to_string(), "secret".to_string())
            .await;
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }

    #[tokio::test]
    async fn digests_are_salted() {
        let hasher = cheap_hasher();
        let first = hasher.hash("same-secret".to_string()).await.unwrap();
        let second = hasher.hash("same-secret".to_string()).await.unwrap();
        assert_ne!(first, second);
    }
}
