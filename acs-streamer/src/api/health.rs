//! Health check and liveness endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: i64,
    pub active_sessions: u64,
    pub transfers_started: u64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "acs-streamer".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.shared.uptime_seconds(),
        active_sessions: state.shared.active_sessions(),
        transfers_started: state.shared.transfers_started(),
    })
}

/// GET /ping
pub async fn ping() -> &'static str {
    "pong"
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ping", get(ping))
}
