//! Brute-force signin lockout over the shared counter store.
//!
//! Flow Overview:
//! 1) `is_locked` is consulted before any credential verification, so a
//!    locked principal never costs a hash comparison.
//! 2) `record_failure` increments `lockout:<principal>`, starting the fixed
//!    window on the first failure.
//! 3) `reset` deletes the counter after a successful verification; a login
//!    one attempt from lockout starts over at zero.
//!
//! This path fails **open**: a store outage must not turn into an
//! authentication outage, so errors degrade to "not locked" and are logged.

use std::sync::Arc;
use tracing::error;

use crate::store::CounterStore;

pub const DEFAULT_LOCKOUT_THRESHOLD: u64 = 5;
pub const DEFAULT_LOCKOUT_WINDOW_SECONDS: u64 = 600;

pub struct LockoutTracker {
    store: Arc<dyn CounterStore>,
    threshold: u64,
    window_seconds: u64,
}

impl LockoutTracker {
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>, threshold: u64, window_seconds: u64) -> Self {
        Self {
            store,
            threshold,
            window_seconds,
        }
    }

    fn key(principal: &str) -> String {
        format!("lockout:{principal}")
    }

    /// Whether the principal has reached the failure threshold in the
    /// current window. Reads without incrementing.
    pub async fn is_locked(&self, principal: &str) -> bool {
        match self.store.get(&Self::key(principal)).await {
            Ok(Some(value)) => value
                .parse::<u64>()
                .map(|attempts| attempts >= self.threshold)
                .unwrap_or(false),
            Ok(None) => false,
            Err(err) => {
                error!("Lockout store unreachable, failing open: {err}");
                false
            }
        }
    }

    /// Count one failed attempt; the first failure in a window sets the
    /// window TTL, later ones never refresh it.
    pub async fn record_failure(&self, principal: &str) {
        let key = Self::key(principal);
        match self.store.increment(&key).await {
            Ok(1) => {
                if let Err(err) = self.store.expire(&key, self.window_seconds).await {
                    error!("Failed to start lockout window for {principal}: {err}");
                }
            }
            Ok(_) => {}
            Err(err) => {
                error!("Failed to record signin failure for {principal}: {err}");
            }
        }
    }

    /// Clear the failure history after a successful verification.
    pub async fn reset(&self, principal: &str) {
        if let Err(err) = self.store.delete(&Self::key(principal)).await {
            error!("Failed to reset lockout counter for {principal}: {err}");
        }
    }
}

impl std::fmt::Debug for LockoutTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockoutTracker")
            .field("threshold", &self.threshold)
            .field("window_seconds", &self.window_seconds)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::UnavailableStore;
    use crate::store::MemoryCounterStore;
    use std::time::Duration;

    fn tracker(store: Arc<dyn CounterStore>) -> LockoutTracker {
        LockoutTracker::new(
            store,
            DEFAULT_LOCKOUT_THRESHOLD,
            DEFAULT_LOCKOUT_WINDOW_SECONDS,
        )
    }

    #[tokio::test]
    async fn five_failures_lock_the_principal() {
        let tracker = tracker(Arc::new(MemoryCounterStore::new()));
        for _ in 0..4 {
            tracker.record_failure("alice").await;
        }
        assert!(!tracker.is_locked("alice").await);

        tracker.record_failure("alice").await;
        assert!(tracker.is_locked("alice").await);
    }

    #[tokio::test]
    async fn reset_starts_a_fresh_count() {
        let tracker = tracker(Arc::new(MemoryCounterStore::new()));
        for _ in 0..4 {
            tracker.record_failure("alice").await;
        }
        tracker.reset("alice").await;

        // One failure after a reset counts as 1, not 5.
        tracker.record_failure("alice").await;
        assert!(!tracker.is_locked("alice").await);
    }

    #[tokio::test]
    async fn lockout_expires_with_the_window() {
        let store = Arc::new(MemoryCounterStore::new());
        let tracker = tracker(store.clone());
        for _ in 0..5 {
            tracker.record_failure("alice").await;
        }
        assert!(tracker.is_locked("alice").await);

        store.advance(Duration::from_secs(DEFAULT_LOCKOUT_WINDOW_SECONDS + 1));
        assert!(!tracker.is_locked("alice").await);
    }

    #[tokio::test]
    async fn principals_are_counted_separately() {
        let tracker = tracker(Arc::new(MemoryCounterStore::new()));
        for _ in 0..5 {
            tracker.record_failure("alice").await;
        }
        assert!(tracker.is_locked("alice").await);
        assert!(!tracker.is_locked("bob").await);
    }

    #[tokio::test]
    async fn store_outage_fails_open() {
        let tracker = tracker(Arc::new(UnavailableStore));
        tracker.record_failure("alice").await;
        assert!(!tracker.is_locked("alice").await);
    }
}
