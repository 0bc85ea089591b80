use axum::Json;
use serde_json::{json, Value};

/// Health check endpoint to verify API status
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
