use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

/// Liveness plus the age of the latest cycle, if any has completed.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let latest = state.latest.read().await.clone();

    match latest {
        Some(report) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "last_cycle_at": report.finished_at,
                "positions": report.positions.len(),
            })),
        ),
        None => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "last_cycle_at": null })),
        ),
    }
}
