use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::auth::{AuthState, require_auth};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MeResponse {
    pub username: String,
}

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "The authenticated principal", body = MeResponse),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer" = [])),
    tag = "me"
)]
pub async fn get_me(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // The identity comes from the token and the session slot; no directory
    // lookup happens on this path.
    match require_auth(&headers, &auth_state).await {
        Ok(principal) => (
            StatusCode::OK,
            Json(MeResponse {
                username: principal.username,
            }),
        )
            .into_response(),
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::{AuthConfig, MemoryPrincipalDirectory, service};
    use crate::api::handlers::auth::password::PasswordHasher;
    use crate::store::MemoryCounterStore;
    use axum::body::to_bytes;
    use axum::http::HeaderValue;
    use secrecy::SecretString;

    async fn signed_in_state() -> (Arc<AuthState>, String) {
        let state = AuthState::new(
            AuthConfig::new(),
            SecretString::from("test-secret-at-least-32-characters-long"),
            Arc::new(MemoryPrincipalDirectory::new()),
            Arc::new(MemoryCounterStore::new()),
        )
        .with_hasher(PasswordHasher::with_params(8, 1, 1));
        service::signup(&state, "alice-tests", "hunter22").await.unwrap();
        let token = service::signin(&state, "alice-tests", "hunter22").await.unwrap();
        (Arc::new(state), token)
    }

    #[tokio::test]
    async fn returns_the_principal_from_the_token() {
        let (state, token) = signed_in_state().await;
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );

        let response = get_me(headers, Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let me: MeResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(me.username, "alice-tests");
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let (state, _token) = signed_in_state().await;
        let response = get_me(HeaderMap::new(), Extension(state))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
