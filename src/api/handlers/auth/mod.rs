//! Authentication: principals, credentials, tokens, sessions and the
//! brute-force tracker.
//!
//! The pieces compose around [`AuthState`]: the signin/signup handlers call
//! into [`service`], which drives the directory, the password hasher, the
//! lockout tracker, the token signer and the session registry. Protected
//! routes go through [`authenticator::authenticate`] instead, which never
//! touches the directory.

pub mod authenticator;
pub mod error;
pub mod lockout;
pub mod password;
pub mod service;
pub mod session;
pub mod signin;
pub mod signup;
pub mod state;
pub mod storage;
pub mod token;
pub mod types;

pub use authenticator::{Principal, Rejection, authenticate, require_auth};
pub use error::AuthError;
pub use state::{AuthConfig, AuthState};
pub use storage::{
    CreateOutcome, MemoryPrincipalDirectory, PgPrincipalDirectory, PrincipalDirectory,
    PrincipalRecord,
};
