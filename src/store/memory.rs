//! In-process counter store.
//!
//! Faithfully reproduces the two contracts the subsystem depends on:
//! `increment` returns sequential values and a TTL set on the first hit is
//! never refreshed by later increments. Time is a manual clock advanced with
//! [`MemoryCounterStore::advance`], so tests can cross window boundaries
//! without sleeping. Also usable for single-process deployments where a
//! shared backend is overkill.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{CounterStore, StoreError, TtlState};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    now: Duration,
}

impl Inner {
    /// Drop the entry if its TTL has lapsed. Expiry is enforced lazily, on
    /// access, which is indistinguishable from eager expiry to callers.
    fn prune(&mut self, key: &str) {
        let expired = self
            .entries
            .get(key)
            .and_then(|entry| entry.expires_at)
            .is_some_and(|expires_at| expires_at <= self.now);
        if expired {
            self.entries.remove(key);
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    inner: Mutex<Inner>,
}

impl MemoryCounterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the store's clock forward.
    pub fn advance(&self, by: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.now += by;
    }
}

#[async_trait::async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.prune(key);
        let current = inner
            .entries
            .get(key)
            .and_then(|entry| entry.value.parse::<u64>().ok())
            .unwrap_or(0);
        let next = current + 1;
        inner
            .entries
            .entry(key.to_string())
            .and_modify(|entry| entry.value = next.to_string())
            .or_insert(Entry {
                value: next.to_string(),
                expires_at: None,
            });
        Ok(next)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.prune(key);
        let now = inner.now;
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.expires_at = Some(now + Duration::from_secs(seconds));
        }
        Ok(())
    }

    async fn ttl_remaining(&self, key: &str) -> Result<TtlState, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.prune(key);
        let now = inner.now;
        Ok(match inner.entries.get(key) {
            None => TtlState::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => TtlState::NoExpiry,
            Some(Entry {
                expires_at: Some(expires_at),
                ..
            }) => TtlState::Remaining(expires_at.saturating_sub(now).as_secs()),
        })
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.prune(key);
        Ok(inner.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.remove(key);
        Ok(())
    }
}
