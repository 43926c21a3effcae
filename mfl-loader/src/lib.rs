//! mfl-loader library interface
//!
//! File-ingestion and companion-matching pipeline: classifies a batch of raw
//! files, pairs caption and analysis sidecars with their primary media file,
//! and delivers enriched entries progressively under bounded concurrency
//! with retry.

pub mod api;
pub mod error;
pub mod loader;
pub mod models;
pub mod observer;
pub mod services;

pub use crate::error::{ApiError, ApiResult, EnrichError, LoadError};
pub use crate::loader::{Collaborators, LoadHandle, LoadOutcome, Loader};
pub use crate::observer::{LoadObserver, NullObserver, RecordingObserver};

use axum::Router;
use chrono::{DateTime, Utc};
use mfl_common::events::EventBus;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::file_scanner::FileScanner;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared loader (owns the single-active session registry)
    pub loader: Arc<Loader>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Scanner used by POST /load
    pub scanner: FileScanner,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// `loader` should publish to `event_bus` for `/events` to see anything
    pub fn new(loader: Arc<Loader>, event_bus: EventBus) -> Self {
        Self {
            loader,
            event_bus,
            scanner: FileScanner::new(),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::load_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
