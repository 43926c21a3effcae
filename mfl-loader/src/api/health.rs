//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Module name ("mfl-loader")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// True while a load session is active
    pub loading: bool,
    /// Active session, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_session: Option<Uuid>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;
    let active_session = state.loader.active_session();

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "mfl-loader".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        loading: active_session.is_some(),
        active_session,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
