use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::{error, instrument, warn};

use super::error::AuthError;
use super::service;
use super::state::AuthState;
use super::types::{Credentials, ErrorResponse, SignupResponse};
use crate::api::handlers::{valid_password, valid_username};

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = Credentials,
    responses(
        (status = 201, description = "Principal created", body = SignupResponse, content_type = "application/json"),
        (status = 400, description = "Invalid username or password", body = ErrorResponse),
        (status = 403, description = "Registration refused", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn signup(
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

    let username = credentials.username.trim().to_string();

    if !valid_username(&username) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid username")),
        )
            .into_response();
    }

    if !valid_password(&credentials.password) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid password")),
        )
            .into_response();
    }

    match service::signup(&auth_state, &username, &credentials.password).await {
        Ok(record) => (
            StatusCode::CREATED,
            Json(SignupResponse {
                id: record.id,
                username: record.username,
            }),
        )
            .into_response(),
        // Same opaque refusal as signin so signup cannot be used to
        // enumerate existing usernames.
        Err(err @ AuthError::PrincipalExists) => {
            warn!("Signup refused for {username}: {err}");
            (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("Forbidden")),
            )
                .into_response()
        }
        Err(err) => {
            error!("Signup failed: {err:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Internal error")),
            )
                .into_response()
        }
    }
}
