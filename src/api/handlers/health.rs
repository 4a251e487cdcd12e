use crate::GIT_COMMIT_HASH;
use crate::store::CounterStore;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    store: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Counter store is reachable", body = [Health]),
        (status = 503, description = "Counter store is unreachable", body = [Health])
    ),
    tag = "health"
)]
pub async fn health(method: Method, store: Extension<Arc<dyn CounterStore>>) -> impl IntoResponse {
    // A plain read doubles as the reachability probe; the key itself never
    // needs to exist.
    let probe = store.get("health").await;
    if let Err(ref err) = probe {
        error!("Counter store health probe failed: {err}");
    }

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: if probe.is_ok() {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        });

    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    let status = if probe.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, headers, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryCounterStore, testing::UnavailableStore};
    use axum::body::to_bytes;

    #[tokio::test]
    async fn healthy_store_reports_ok() {
        let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
        let response = health(Method::GET, Extension(store)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-App"));

        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let health: Health = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.store, "ok");
        assert_eq!(health.name, env!("CARGO_PKG_NAME"));
    }

    #[tokio::test]
    async fn unreachable_store_reports_503() {
        let store: Arc<dyn CounterStore> = Arc::new(UnavailableStore);
        let response = health(Method::GET, Extension(store)).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        let health: Health = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.store, "error");
    }

    #[tokio::test]
    async fn options_returns_an_empty_body() {
        let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
        let response = health(Method::OPTIONS, Extension(store))
            .await
            .into_response();
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        assert!(body.is_empty());
    }
}
