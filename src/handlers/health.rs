//! Health check handler

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::db;
use crate::state::AppState;

/// GET /health - Liveness plus a store ping
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match db::check_health(&state.db_pool).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
