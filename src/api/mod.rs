//! HTTP surface: route wiring, middleware stack and server startup.

use crate::api::handlers::{auth, health, root};
use crate::store::{CounterStore, RedisCounterStore};
use crate::throttle::{ThrottleGuard, ThrottleLayerState, ThrottleProfile};
use anyhow::{Context, Result};
use axum::{
    Extension, Router, middleware,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, options},
};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;

pub mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Assemble the full application: documented routes, the undocumented extras
/// and the middleware stack. Shared with the integration tests so they run
/// the same pipeline the server binds, throttle stage included.
#[must_use]
pub fn app(
    auth_state: Arc<auth::AuthState>,
    store: Arc<dyn CounterStore>,
    throttle_state: Arc<ThrottleLayerState>,
) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    // Build the router from OpenAPI-wired routes, then extend it with non-doc
    // routes like `/` and preflight-only `OPTIONS /health`.
    let (router, _openapi) = router().split_for_parts();
    router
        .route("/", get(root::root))
        .route("/health", options(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(middleware::from_fn_with_state(
                    throttle_state,
                    crate::throttle::layer::throttle,
                ))
                .layer(Extension(auth_state))
                .layer(Extension(store)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    store_url: String,
    store_timeout: Duration,
    signing_secret: SecretString,
    auth_config: auth::AuthConfig,
    profile: ThrottleProfile,
) -> Result<()> {
    let store: Arc<dyn CounterStore> = Arc::new(
        RedisCounterStore::connect_with_timeout(&store_url, store_timeout)
            .await
            .context("Failed to connect to counter store")?,
    );

    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let directory = Arc::new(auth::PgPrincipalDirectory::new(pool));
    let auth_state = Arc::new(auth::AuthState::new(
        auth_config,
        signing_secret,
        directory,
        store.clone(),
    ));

    let throttle_state = Arc::new(ThrottleLayerState::new(
        ThrottleGuard::new(store.clone()),
        profile,
    ));

    let app = app(auth_state, store, throttle_state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    // ConnectInfo feeds the default client tracker when no forwarding
    // headers are present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {err}");
        }
        info!("Gracefully shutdown");
    })
    .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_span_falls_back_without_a_request_id() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        // Only checks construction; span fields are not inspectable here.
        let _span = make_span(&request);
    }
}
