//! Per-request bearer credential verification.
//!
//! State machine with two terminal outcomes: a [`Principal`] or a
//! [`Rejection`]. The steps, in order: extract the bearer token, verify
//! signature and expiry, read the `sub` claim, and cross-check the session
//! registry. The registry check is what revokes tokens: a signature-valid
//! token that no longer matches the principal's slot is rejected.
//!
//! Nothing is mutated on the success path, and every rejection kind maps to
//! a plain 401 at the boundary; expired vs tampered vs revoked is for the
//! server logs only.

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use tracing::{debug, error};

use super::state::AuthState;
use super::token::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid bearer token")]
    InvalidToken,
    #[error("expired bearer token")]
    ExpiredToken,
}

/// Authenticated identity derived from a verified credential.
#[derive(Debug, Clone)]
pub struct Principal {
    pub username: String,
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Run the full verification state machine for one request.
///
/// # Errors
/// Returns the rejection kind; callers at the HTTP boundary collapse all of
/// them to 401.
pub async fn authenticate(headers: &HeaderMap, state: &AuthState) -> Result<Principal, Rejection> {
    let token = extract_bearer_token(headers).ok_or(Rejection::MissingToken)?;

    let claims = state.signer().verify(&token).map_err(|err| match err {
        TokenError::Expired => Rejection::ExpiredToken,
        TokenError::Invalid => Rejection::InvalidToken,
    })?;

    if claims.sub.is_empty() {
        return Err(Rejection::InvalidToken);
    }

    match state.sessions().current_token(&claims.sub).await {
        // Byte equality against the slot; a re-issued token displaces this one.
        Ok(Some(current)) if current == token => Ok(Principal {
            username: claims.sub,
        }),
        Ok(_) => Err(Rejection::InvalidToken),
        Err(err) => {
            // Fail open: a store outage must not lock every caller out while
            // the signature and expiry already checked out.
            error!("Session registry unreachable, accepting verified token: {err}");
            Ok(Principal {
                username: claims.sub,
            })
        }
    }
}

/// Resolve the request's principal, or return 401 for any rejection.
pub async fn require_auth(headers: &HeaderMap, state: &AuthState) -> Result<Principal, StatusCode> {
    match authenticate(headers, state).await {
        Ok(principal) => Ok(principal),
        Err(rejection) => {
            debug!("Request rejected: {rejection}");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
