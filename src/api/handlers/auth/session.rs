//! Single-slot session registry and the logout endpoint.
//!
//! One slot per principal: issuing a token unconditionally overwrites the
//! previous one, which is the sole revocation mechanism. The old token
//! keeps a valid signature but stops matching the slot, so the request
//! authenticator rejects it. No blacklist exists or is needed.

use axum::{extract::Extension, http::HeaderMap, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::error;

use super::authenticator::require_auth;
use super::state::AuthState;
use crate::store::{CounterStore, StoreError};

pub struct SessionRegistry {
    store: Arc<dyn CounterStore>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    fn key(principal: &str) -> String {
        format!("session:{principal}")
    }

    /// Write the principal's slot, replacing whatever token was there.
    ///
    /// SET then EXPIRE; like the counters, the pair is only best-effort
    /// atomic and a crash in between leaves a slot without a TTL.
    ///
    /// # Errors
    /// Propagates `StoreError`; the signin path treats it as non-fatal.
    pub async fn issue(
        &self,
        principal: &str,
        token: &str,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let key = Self::key(principal);
        self.store.set(&key, token).await?;
        self.store.expire(&key, ttl_seconds).await
    }

    /// The currently valid token for the principal, if any.
    ///
    /// # Errors
    /// Propagates `StoreError` so the caller can apply its fail-open policy.
    pub async fn current_token(&self, principal: &str) -> Result<Option<String>, StoreError> {
        self.store.get(&Self::key(principal)).await
    }

    /// Drop the slot (explicit logout).
    ///
    /// # Errors
    /// Propagates `StoreError`.
    pub async fn revoke(&self, principal: &str) -> Result<(), StoreError> {
        self.store.delete(&Self::key(principal)).await
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry").finish_non_exhaustive()
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session slot cleared"),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    if let Err(err) = auth_state.sessions().revoke(&principal.username).await {
        // Best effort: the slot still dies with its TTL.
        error!("Failed to revoke session slot: {err}");
    }
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCounterStore;
    use std::time::Duration;

    #[tokio::test]
    async fn issue_overwrites_the_previous_token() {
        let registry = SessionRegistry::new(Arc::new(MemoryCounterStore::new()));
        registry.issue("alice", "first", 600).await.unwrap();
        registry.issue("alice", "second", 600).await.unwrap();
        assert_eq!(
            registry.current_token("alice").await.unwrap().as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn revoke_empties_the_slot() {
        let registry = SessionRegistry::new(Arc::new(MemoryCounterStore::new()));
        registry.issue("alice", "token", 600).await.unwrap();
        registry.revoke("alice").await.unwrap();
        assert_eq!(registry.current_token("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn slot_expires_with_its_ttl() {
        let store = Arc::new(MemoryCounterStore::new());
        let registry = SessionRegistry::new(store.clone());
        registry.issue("alice", "token", 600).await.unwrap();

        store.advance(Duration::from_secs(601));
        assert_eq!(registry.current_token("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn slots_are_per_principal() {
        let registry = SessionRegistry::new(Arc::new(MemoryCounterStore::new()));
        registry.issue("alice", "token-a", 600).await.unwrap();
        registry.issue("bob", "token-b", 600).await.unwrap();
        assert_eq!(
            registry.current_token("alice").await.unwrap().as_deref(),
            Some("token-a")
        );
        assert_eq!(
            registry.current_token("bob").await.unwrap().as_deref(),
            Some("token-b")
        );
    }
}
