//! Signed bearer credential issuance and verification.
//!
//! Tokens are HS256 JWTs with `{sub, jti, iat, exp}` claims. Verification
//! here only proves signature and expiry; the authenticator additionally
//! checks the session registry, which is what makes revocation-by-reissue
//! work without a blacklist.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::error;
use ulid::Ulid;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// Unique per issuance. Timestamps are second-resolution, so without it
    /// two signins in the same second would mint byte-identical tokens and
    /// the overwrite-based revocation could not tell them apart.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Expired and tampered tokens are distinguishable failure kinds: the
/// boundary folds both into 401, but diagnostics must tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
    ttl_seconds: i64,
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: SecretString, ttl_seconds: i64) -> Self {
        Self {
            secret,
            ttl_seconds,
        }
    }

    /// Issue a signed credential for `principal` expiring after the
    /// configured TTL.
    ///
    /// # Errors
    /// Returns `TokenError::Invalid` if encoding fails.
    pub fn sign(&self, principal: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.to_string(),
            jti: Ulid::new().to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.ttl_seconds)).timestamp(),
        };
        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::default(), &claims, &key).map_err(|err| {
            error!("Failed to encode token: {err}");
            TokenError::Invalid
        })
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// # Errors
    /// Returns `TokenError::Expired` for an expired signature and
    /// `TokenError::Invalid` for anything else (malformed, tampered, wrong
    /// key).
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    pub(crate) fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"***")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}
