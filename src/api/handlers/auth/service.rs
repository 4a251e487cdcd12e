//! Signin/signup orchestration.
//!
//! Flow Overview (signin):
//! 1) Look up the principal in the directory.
//! 2) Consult the lockout tracker *before* the expensive hash comparison.
//! 3) Verify the secret; a mismatch records a failure, a match resets the
//!    failure history, even when the account was one attempt from lockout.
//! 4) Sign a fresh token and write it into the principal's session slot,
//!    silently revoking any previously issued token.

use anyhow::anyhow;
use tracing::error;

use super::error::AuthError;
use super::state::AuthState;
use super::storage::{CreateOutcome, PrincipalRecord};

/// Authenticate a principal and issue a signed token.
///
/// # Errors
/// Returns the domain failure kind; the HTTP boundary collapses all of them
/// to a generic forbidden response.
pub async fn signin(state: &AuthState, username: &str, password: &str) -> Result<String, AuthError> {
    let record = state
        .directory()
        .find(username)
        .await
        .map_err(AuthError::Internal)?
        .ok_or(AuthError::PrincipalNotFound)?;

    // Locked principals are rejected before any hash work.
    if state.lockout().is_locked(username).await {
        return Err(AuthError::TooManyAttempts);
    }

    let valid = state
        .hasher()
        .verify(record.password_digest, password.to_string())
        .await?;
    if !valid {
        state.lockout().record_failure(username).await;
        return Err(AuthError::InvalidCredential);
    }

    state.lockout().reset(username).await;

    let token = state
        .signer()
        .sign(username)
        .map_err(|err| AuthError::Internal(anyhow!("failed to sign token: {err}")))?;

    let ttl_seconds = u64::try_from(state.config().token_ttl_seconds()).unwrap_or(0);
    if let Err(err) = state.sessions().issue(username, &token, ttl_seconds).await {
        // Fail open: a store outage must not block a verified signin. The
        // authenticator applies the matching policy on its read side.
        error!("Failed to write session slot for {username}: {err}");
    }

    Ok(token)
}

/// Create a principal with a hashed secret.
///
/// # Errors
/// Returns `PrincipalExists` when the username is taken, `Internal` for
/// directory or hashing failures.
pub async fn signup(
    state: &AuthState,
    username: &str,
    password: &str,
) -> Result<PrincipalRecord, AuthError> {
    if state
        .directory()
        .find(username)
        .await
        .map_err(AuthError::Internal)?
        .is_some()
    {
        return Err(AuthError::PrincipalExists);
    }

    let digest = state.hasher().hash(password.to_string()).await?;
    match state
        .directory()
        .create(username, &digest)
        .await
        .map_err(AuthError::Internal)?
    {
        CreateOutcome::Created(record) => Ok(record),
        CreateOutcome::Conflict => Err(AuthError::PrincipalExists),
    }
}
