//! REST API handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use macport_core::InventoryRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use crate::search::{lookup, SearchError};
use crate::state::AppState;

/// Failure body, `{"success": false, "message": ...}`
#[derive(Serialize)]
struct ApiError {
    success: bool,
    message: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            message: msg.into(),
        }
    }
}

#[derive(Serialize)]
struct SearchResponse {
    success: bool,
    result: Vec<InventoryRecord>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    mac: Option<String>,
}

/// Search page, built into the binary
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Look up where a MAC address has been seen
pub async fn search_mac(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = params.mac.unwrap_or_default();
    debug!(mac = %query, "Search requested");

    let lookup_state = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        lookup(&lookup_state.store, &query, &lookup_state.skip_ports)
    })
    .await;

    match result {
        Ok(Ok(records)) => Json(SearchResponse {
            success: true,
            result: records,
        })
        .into_response(),
        Ok(Err(e)) => search_error(e),
        Err(e) => {
            error!(error = %e, "Search task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new("Error executing query.")),
            )
                .into_response()
        }
    }
}

fn search_error(e: SearchError) -> Response {
    let status = match &e {
        SearchError::Missing | SearchError::Invalid => StatusCode::BAD_REQUEST,
        SearchError::NotFound => StatusCode::NOT_FOUND,
        SearchError::Store(err) => {
            error!(error = %err, "Inventory query failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new("Error executing query.")),
            )
                .into_response();
        }
    };
    (status, Json(ApiError::new(e.to_string()))).into_response()
}

/// Liveness plus the current row count
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || store.count()).await {
        Ok(Ok(records)) => Json(serde_json::json!({
            "status": "ok",
            "records": records
        }))
        .into_response(),
        Ok(Err(e)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(format!("Database unavailable: {}", e))),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(format!("Health check failed: {}", e))),
        )
            .into_response(),
    }
}
