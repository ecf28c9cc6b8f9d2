//! Health check handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use mflow_models::QueueLimit;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub queue_id: u64,
    pub queue_length: usize,
    pub max_queue_length: QueueLimit,
}

/// Liveness probe, with the current queue depth.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        queue_id: state.scheduler.queue_id(),
        queue_length: state.scheduler.queue_length(),
        max_queue_length: state.scheduler.max_queue_length(),
    })
}
