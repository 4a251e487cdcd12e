//! Per-route request admission control over the shared counter store.
//!
//! Flow Overview:
//! 1) Build the tracker key `throttle:<profile>:<client>`.
//! 2) `INCR` the key; when the result is 1, `EXPIRE` it with the window.
//! 3) Read the TTL and derive a [`ThrottleDecision`] for this request.
//!
//! The window is fixed-length, not sliding: the TTL is assigned exactly once,
//! when the counter transitions 0 -> 1, and later hits never refresh it.
//!
//! When the store cannot be consulted the guard fails **closed** (the request
//! is denied). An unreachable store must not turn this service into an open
//! amplifier; the lockout and session paths make the opposite call.

use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::store::{CounterStore, TtlState};

pub mod layer;

pub use layer::{default_tracker, ThrottleLayerState, Tracker};

pub const DEFAULT_PROFILE_NAME: &str = "default";
pub const DEFAULT_LIMIT: u64 = 3;
pub const DEFAULT_WINDOW_SECONDS: u64 = 60;

/// A named admission profile for a group of routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleProfile {
    pub name: String,
    pub limit: u64,
    pub window_seconds: u64,
    /// Accepted for configuration compatibility but currently inert: once
    /// the counting window's TTL lapses the client is admitted again, even
    /// when this value is longer than the window.
    pub block_duration_seconds: u64,
}

impl Default for ThrottleProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            limit: DEFAULT_LIMIT,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            block_duration_seconds: 0,
        }
    }
}

/// Admission outcome for a single request.
///
/// Derived, never persisted: a pure function of the counter read and the
/// profile, recomputed fresh per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ThrottleDecision {
    pub total_hits: u64,
    pub limit: u64,
    pub window_seconds: u64,
    pub time_to_expire_ms: u64,
    pub is_blocked: bool,
    pub remaining: u64,
}

impl ThrottleDecision {
    #[must_use]
    pub fn compute(total_hits: u64, limit: u64, window_seconds: u64, ttl: TtlState) -> Self {
        let time_to_expire_ms = match ttl {
            TtlState::Remaining(seconds) => seconds * 1000,
            TtlState::NoExpiry | TtlState::Missing => 0,
        };
        Self {
            total_hits,
            limit,
            window_seconds,
            time_to_expire_ms,
            is_blocked: total_hits > limit,
            remaining: limit.saturating_sub(total_hits),
        }
    }

    /// Seconds a denied client should wait before retrying.
    #[must_use]
    pub fn retry_after_seconds(&self) -> u64 {
        if self.time_to_expire_ms > 0 {
            self.time_to_expire_ms.div_ceil(1000)
        } else {
            self.window_seconds
        }
    }

    /// Deny decision used when the store could not be consulted.
    #[must_use]
    pub fn denied(profile: &ThrottleProfile) -> Self {
        Self {
            total_hits: profile.limit + 1,
            limit: profile.limit,
            window_seconds: profile.window_seconds,
            time_to_expire_ms: profile.window_seconds * 1000,
            is_blocked: true,
            remaining: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ThrottleError {
    #[error("request throttled")]
    Limited(ThrottleDecision),
}

/// Admission control against the shared counter store.
#[derive(Clone)]
pub struct ThrottleGuard {
    store: Arc<dyn CounterStore>,
}

impl ThrottleGuard {
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Decide whether a request from `client` passes under `profile`.
    ///
    /// # Errors
    /// Returns `ThrottleError::Limited` with the decision when the client is
    /// over the profile's limit, or when the store is unreachable (denied by
    /// policy, not by count).
    pub async fn admit(
        &self,
        profile: &ThrottleProfile,
        client: &str,
    ) -> Result<ThrottleDecision, ThrottleError> {
        let key = format!("throttle:{}:{}", profile.name, client);

        let total_hits = match self.store.increment(&key).await {
            Ok(hits) => hits,
            Err(err) => {
                error!("Throttle store unreachable, denying request: {err}");
                return Err(ThrottleError::Limited(ThrottleDecision::denied(profile)));
            }
        };

        if total_hits == 1 {
            if let Err(err) = self.store.expire(&key, profile.window_seconds).await {
                error!("Throttle store unreachable, denying request: {err}");
                return Err(ThrottleError::Limited(ThrottleDecision::denied(profile)));
            }
        }

        let ttl = match self.store.ttl_remaining(&key).await {
            Ok(ttl) => ttl,
            Err(err) => {
                error!("Throttle store unreachable, denying request: {err}");
                return Err(ThrottleError::Limited(ThrottleDecision::denied(profile)));
            }
        };

        let decision =
            ThrottleDecision::compute(total_hits, profile.limit, profile.window_seconds, ttl);
        if decision.is_blocked {
            Err(ThrottleError::Limited(decision))
        } else {
            Ok(decision)
        }
    }
}

impl std::fmt::Debug for ThrottleGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottleGuard").finish_non_exhaustive()
    }
}
