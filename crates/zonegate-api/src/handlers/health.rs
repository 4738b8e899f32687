//! Health check handlers

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use zonegate_common::Error;

/// Basic health check
pub async fn health() -> Json<Value> {
    Json(json!({ "success": true, "status": "healthy" }))
}

/// Liveness probe
pub async fn liveness() -> Json<Value> {
    Json(json!({ "success": true, "status": "alive" }))
}

/// Readiness probe, checks database connectivity
pub async fn readiness(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    state.db_pool.health_check().await.map_err(|e| {
        ApiError(Error::ServiceUnavailable(format!(
            "Database not ready: {}",
            e
        )))
    })?;

    Ok(Json(json!({ "success": true, "status": "ready" })))
}
