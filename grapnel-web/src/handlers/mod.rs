//! HTTP request handlers

pub mod download;
pub mod metadata;

use axum::Json;
use axum::extract::State;
use serde_json::json;

pub use download::download;
pub use metadata::metadata;

use crate::server::AppState;

/// Liveness endpoint.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "uptimeSeconds": state.started_at.elapsed().as_secs(),
    }))
}
