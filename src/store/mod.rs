//! Shared atomic counter store.
//!
//! Everything abuse-protection related (throttling, lockout, session slots)
//! is built on this narrow interface instead of a backend's full client
//! surface. The single correctness anchor is [`CounterStore::increment`]:
//! two concurrent callers racing on an absent key must observe distinct
//! sequential values (1, 2, ...). The store is the only point of
//! serialization; callers take no in-process locks.
//!
//! The consumer pattern is always the same: `increment`, and only when the
//! returned value is 1, `expire` with the window length. A crash between the
//! two calls leaves a key without a TTL; this is an accepted, bounded
//! operational risk rather than something we pay a transaction for.

use async_trait::async_trait;

pub mod memory;
pub mod redis;

pub use memory::MemoryCounterStore;
pub use redis::RedisCounterStore;

/// Failure talking to the counter store.
///
/// Covers transport errors and per-operation timeouts alike; callers decide
/// fail-open vs fail-closed, never retry (a retried `INCR` after an
/// ambiguous timeout could double-count).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("counter store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Remaining lifetime of a key, in whole seconds.
///
/// Mirrors the Redis `TTL` sentinel values (-1 no expiry, -2 missing) as a
/// typed result so callers cannot confuse them with real durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlState {
    Remaining(u64),
    NoExpiry,
    Missing,
}

/// Minimal operation set required from an atomic key-value backend.
///
/// Implementations must make `increment` atomic across concurrent callers,
/// including callers in separate processes.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter for `key`, creating it at 0 first
    /// if absent. Returns the new value.
    async fn increment(&self, key: &str) -> Result<u64, StoreError>;

    /// Set or replace the key's time-to-live.
    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError>;

    /// Time until expiry for `key`.
    async fn ttl_remaining(&self, key: &str) -> Result<TtlState, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{CounterStore, StoreError, TtlState};
    use async_trait::async_trait;

    /// A store where every operation fails, for fail-open/fail-closed tests.
    pub(crate) struct UnavailableStore;

    impl UnavailableStore {
        fn err() -> StoreError {
            StoreError::Unavailable {
                reason: "connection refused".to_string(),
            }
        }
    }

    #[async_trait]
    impl CounterStore for UnavailableStore {
        async fn increment(&self, _key: &str) -> Result<u64, StoreError> {
            Err(Self::err())
        }

        async fn expire(&self, _key: &str, _seconds: u64) -> Result<(), StoreError> {
            Err(Self::err())
        }

        async fn ttl_remaining(&self, _key: &str) -> Result<TtlState, StoreError> {
            Err(Self::err())
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(Self::err())
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(Self::err())
        }

        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Err(Self::err())
        }
    }
}
