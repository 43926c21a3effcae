//! Load control handlers
//!
//! POST /load, POST /load/reset

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use mfl_common::events::EntrySummary;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, LoadError};
use crate::models::{LoadMode, LoadParameters};
use crate::AppState;

/// POST /load request
#[derive(Debug, Deserialize)]
pub struct StartLoadRequest {
    pub folder: String,
    /// Overrides the service's configured parameters
    #[serde(default)]
    pub parameters: Option<LoadParameters>,
}

/// POST /load response
#[derive(Debug, Serialize)]
pub struct StartLoadResponse {
    pub session_id: Uuid,
    pub mode: LoadMode,
    pub total_entries: usize,
    /// Phase-1 stubs, available before enrichment starts
    pub entries: Vec<EntrySummary>,
}

/// POST /load
///
/// Scan `folder` and start a session. Enrichment continues in the background;
/// progress is streamed on `/events`.
pub async fn start_load(
    State(state): State<AppState>,
    Json(request): Json<StartLoadRequest>,
) -> ApiResult<Json<StartLoadResponse>> {
    let folder = PathBuf::from(&request.folder);
    if !folder.is_dir() {
        return Err(ApiError::BadRequest(format!(
            "Folder does not exist or is not a directory: {}",
            request.folder
        )));
    }

    // Fail fast before walking a large tree
    if let Some(active) = state.loader.active_session() {
        return Err(LoadError::SessionConflict { active }.into());
    }

    let params = request
        .parameters
        .unwrap_or_else(|| state.loader.parameters().clone());
    params.validate()?;
    let mode = if params.progressive_mode {
        LoadMode::Progressive
    } else {
        LoadMode::Standard
    };

    let scanner = state.scanner.clone();
    let files = tokio::task::spawn_blocking(move || scanner.scan(&folder))
        .await
        .map_err(|e| ApiError::Internal(format!("Scan task failed: {}", e)))?
        .map_err(LoadError::from)?;

    let handle = state.loader.start_with(files, params)?;
    let session_id = handle.session_id();
    let entries = handle.stubs().to_vec();

    tracing::info!(
        session_id = %session_id,
        folder = %request.folder,
        entries = entries.len(),
        "Load session started"
    );

    tokio::spawn(async move {
        match handle.wait().await {
            Ok(outcome) => tracing::info!(
                session_id = %session_id,
                state = ?outcome.session.state,
                entries = outcome.entries.len(),
                "Background load task finished"
            ),
            Err(e) => tracing::error!(
                session_id = %session_id,
                error = %e,
                "Background load task failed"
            ),
        }
    });

    Ok(Json(StartLoadResponse {
        session_id,
        mode,
        total_entries: entries.len(),
        entries,
    }))
}

/// POST /load/reset
///
/// Supersede the active session, if any.
pub async fn reset_load(State(state): State<AppState>) -> StatusCode {
    if let Some(session_id) = state.loader.reset() {
        tracing::info!(session_id = %session_id, "Load session reset by request");
    }
    StatusCode::NO_CONTENT
}

/// Build load routes
pub fn load_routes() -> Router<AppState> {
    Router::new()
        .route("/load", post(start_load))
        .route("/load/reset", post(reset_load))
}
