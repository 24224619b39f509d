use std::time::Duration;

use axum::{extract::State, Json};

use crate::{
    web::types::{DatabaseStatus, HealthResponse},
    AppState,
};

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Always answers `200`, the `database` field carries the store's reachability.
pub async fn health(State(app_state): State<AppState>) -> Json<HealthResponse> {
    let reachable = tokio::time::timeout(PING_TIMEOUT, app_state.workflow.store().ping())
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: "OK",
        message: "Newsletter API is running",
        timestamp: chrono::Utc::now().to_rfc3339(),
        database: DatabaseStatus::from(reachable),
    })
}
