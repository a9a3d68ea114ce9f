//! Job-status endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db::jobs,
    error::{ApiError, ApiResult},
    models::{JobRecord, JobState},
    AppState,
};

/// Default number of records returned by list endpoints
pub const DEFAULT_LIST_LIMIT: u32 = 25;

/// Upper bound on `limit`
pub const MAX_LIST_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

/// One artifact in a status response
#[derive(Debug, Serialize)]
pub struct ArtifactView {
    pub kind: crate::models::ArtifactKind,
    pub file_name: Option<String>,
    pub path: String,
}

/// GET /jobs/{job_id} response
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub title: String,
    pub state: JobState,
    /// "pending", "succeeded" or "failed"
    pub status: String,
    pub artifacts: Vec<ArtifactView>,
    pub error: Option<String>,
    pub failed_stage: Option<JobState>,
    pub fallbacks: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobRecord> for JobStatusResponse {
    fn from(record: JobRecord) -> Self {
        let artifacts = record
            .artifacts
            .iter()
            .map(|a| ArtifactView {
                kind: a.kind,
                file_name: a.file_name(),
                path: a.path.display().to_string(),
            })
            .collect();

        Self {
            job_id: record.job_id.to_string(),
            title: record.title,
            state: record.state,
            status: record.state.status().to_string(),
            artifacts,
            error: record.error,
            failed_stage: record.failed_stage,
            fallbacks: record.fallbacks,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// GET /jobs/{job_id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let record = jobs::load_job(&state.db, &job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", job_id)))?;

    Ok(Json(record.into()))
}

/// GET /jobs?limit=N
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<JobStatusResponse>>> {
    let records = jobs::list_recent(&state.db, query.effective_limit()).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Build job-status routes
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", get(get_job))
}
