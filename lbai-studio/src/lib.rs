//! lbai-studio library interface
//!
//! Exposes the pipeline components, the orchestrator and the HTTP router for
//! the binary and for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult, PipelineError, PipelineResult};

use axum::Router;
use chrono::{DateTime, Utc};
use lbai_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::StudioPaths;
use crate::services::JobOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Job-status table
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub orchestrator: Arc<JobOrchestrator>,
    /// Output, public and voice sample directories
    pub paths: StudioPaths,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, orchestrator: Arc<JobOrchestrator>) -> Self {
        let paths = orchestrator.paths().clone();
        Self {
            db,
            event_bus,
            orchestrator,
            paths,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::generate_routes())
        .merge(api::job_routes())
        .merge(api::artifact_routes())
        .merge(api::voice_sample_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
