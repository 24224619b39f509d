use axum::Json;
use serde_json::{json, Value};

/// Service metadata and the endpoints it serves.
pub async fn home() -> Json<Value> {
    Json(json!({
        "message": "Newsletter API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "subscribe": "POST /api/newsletter/subscribe",
            "health": "GET /health",
        }
    }))
}
