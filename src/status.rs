use crate::relay::RoomRegistry;
use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Status endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    /// Number of rooms with at least one member
    pub rooms: usize,
}

/// Report server liveness and the active room count
pub async fn status_handler(State(registry): State<Arc<RoomRegistry>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        rooms: registry.room_count(),
    })
}

/// Routes for the status endpoint
pub fn routes(registry: Arc<RoomRegistry>) -> Router {
    Router::new()
        .route("/health/check", get(status_handler))
        .with_state(registry)
}
