use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::{error, instrument, warn};

use super::error::AuthError;
use super::service;
use super::state::AuthState;
use super::types::{Credentials, ErrorResponse, TokenResponse};

#[utoipa::path(
    post,
    path = "/v1/auth/signin",
    request_body = Credentials,
    responses(
        (status = 201, description = "Token issued", body = TokenResponse, content_type = "application/json"),
        (status = 400, description = "Missing payload", body = ErrorResponse),
        (status = 403, description = "Authentication refused", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn signin(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<Credentials>>,
) -> impl IntoResponse {
    let Some(Json(credentials)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Missing payload")),
        )
            .into_response();
    };

    match service::signin(&auth_state, &credentials.username, &credentials.password).await {
        Ok(access_token) => {
            (StatusCode::CREATED, Json(TokenResponse { access_token })).into_response()
        }
        // One opaque body for every refusal so callers cannot probe which
        // usernames exist or which accounts are locked.
        Err(
            err @ (AuthError::PrincipalNotFound
            | AuthError::InvalidCredential
            | AuthError::TooManyAttempts),
        ) => {
            warn!("Signin refused for {}: {err}", credentials.username);
            (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("Forbidden")),
            )
                .into_response()
        }
        Err(err) => {
            error!("Signin failed: {err:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Internal error")),
            )
                .into_response()
        }
    }
}
