//! Web server setup and routing

use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api;
use crate::state::AppState;

/// Build the search page and API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/api/search", get(api::search_mac))
        .route("/api/health", get(api::health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the search API until the process exits
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting search API");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use macport_core::{InventoryStore, MacAddress, MacPortEntry, Vendor};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let store = Arc::new(InventoryStore::open_in_memory().unwrap());
        let mac: MacAddress = "00:14:29:30:37:02".parse().unwrap();
        store
            .upsert(
                "sw1",
                "10.0.0.1",
                Vendor::Cisco,
                &[MacPortEntry::new(mac, "Gi0/5"), MacPortEntry::new(mac, "Po1")],
            )
            .unwrap();
        router(AppState::new(
            store,
            vec!["Po".into(), "Port-Channel".into(), "lag".into()],
        ))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_search_found() {
        let (status, body) = get_json(app(), "/api/search?mac=00-14-29-30-37-02").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let result = body["result"].as_array().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["switch_name"], "sw1");
        assert_eq!(result[0]["port_name"], "Gi0/5");
        assert_eq!(result[0]["mac_address"], "00:14:29:30:37:02");
    }

    #[tokio::test]
    async fn test_search_missing_mac() {
        let (status, body) = get_json(app(), "/api/search").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "MAC address is required.");

        let (status, _) = get_json(app(), "/api/search?mac=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_invalid_mac() {
        let (status, body) = get_json(app(), "/api/search?mac=zz:14").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid MAC address.");
    }

    #[tokio::test]
    async fn test_search_not_found() {
        let (status, body) = get_json(app(), "/api/search?mac=AABBCCDDEEFF").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "MAC address not found.");
    }

    #[tokio::test]
    async fn test_index_page() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[axum::http::header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/html"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("<title>MAC Address Search</title>"));
        assert!(page.contains("/api/search?mac="));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(app(), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["records"], 2);
    }
}
