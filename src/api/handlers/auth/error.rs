//! Authentication-domain failure taxonomy.
//!
//! Every variant except `Internal` is terminal for the current request and
//! collapses to a generic 403 at the HTTP boundary; the specific kind is
//! kept for server-side logs only, so callers cannot enumerate usernames or
//! probe the attempt counter.

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("principal not found")]
    PrincipalNotFound,

    #[error("principal already exists")]
    PrincipalExists,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("too many failed attempts")]
    TooManyAttempts,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
