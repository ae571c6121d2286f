use axum::Json;
use serde_json::{json, Value};

/// Liveness only; dependencies are not probed.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
