//! Axum middleware for the throttle guard.
//!
//! Runs before authentication and business logic. On pass, the decision is
//! attached to the request's extensions so downstream stages can log the
//! remaining budget; on block, the client gets a 429 with `Retry-After` and
//! a small JSON body.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::RETRY_AFTER, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::{ThrottleError, ThrottleGuard, ThrottleProfile};

/// Derives the client identity a counter is keyed on.
///
/// Pluggable so deployments behind shared NAT can track an authenticated
/// principal or a custom header instead of the network address.
pub type Tracker = Arc<dyn Fn(&Request<Body>) -> Option<String> + Send + Sync>;

/// State handed to the middleware: one instance per throttle profile.
#[derive(Clone)]
pub struct ThrottleLayerState {
    guard: ThrottleGuard,
    profile: ThrottleProfile,
    tracker: Tracker,
}

impl ThrottleLayerState {
    #[must_use]
    pub fn new(guard: ThrottleGuard, profile: ThrottleProfile) -> Self {
        Self {
            guard,
            profile,
            tracker: default_tracker(),
        }
    }

    #[must_use]
    pub fn with_tracker(mut self, tracker: Tracker) -> Self {
        self.tracker = tracker;
        self
    }
}

/// Client-visible rejection body when a request is throttled.
#[derive(Debug, Serialize, ToSchema)]
pub struct ThrottledResponse {
    pub limit: u64,
    pub remaining: u64,
    pub retry_after_seconds: u64,
}

/// Default client identity: proxy headers first, then the socket address.
#[must_use]
pub fn default_tracker() -> Tracker {
    Arc::new(|request: &Request<Body>| {
        let headers = request.headers();
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if forwarded.is_some() {
            return forwarded;
        }
        let real_ip = headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if real_ip.is_some() {
            return real_ip;
        }
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip().to_string())
    })
}

/// Admission stage, wired with `axum::middleware::from_fn_with_state`.
pub async fn throttle(
    State(state): State<Arc<ThrottleLayerState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let client = (state.tracker)(&request).unwrap_or_else(|| "unknown".to_string());

    match state.guard.admit(&state.profile, &client).await {
        Ok(decision) => {
            debug!(
                profile = %state.profile.name,
                total_hits = decision.total_hits,
                remaining = decision.remaining,
                "Request admitted"
            );
            // Allowed requests carry the decision for downstream telemetry.
            request.extensions_mut().insert(decision);
            next.run(request).await
        }
        Err(ThrottleError::Limited(decision)) => {
            warn!(
                profile = %state.profile.name,
                client = %client,
                total_hits = decision.total_hits,
                "Request throttled"
            );
            let retry_after = decision.retry_after_seconds();
            let body = ThrottledResponse {
                limit: decision.limit,
                remaining: 0,
                retry_after_seconds: retry_after,
            };
            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
            response
        }
    }
}
