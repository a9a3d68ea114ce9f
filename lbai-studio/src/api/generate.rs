//! Job submission
//!
//! POST /generate accepts the job and answers 202 before any stage runs.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;

use crate::{error::ApiResult, models::JobRequest, AppState};

/// POST /generate response
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub message: String,
    /// Always "working"
    pub status: String,
    pub job_id: String,
    pub poll_latest: String,
    pub list_files: String,
    pub job_status: String,
}

/// POST /generate
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> ApiResult<(StatusCode, Json<GenerateResponse>)> {
    let record = state.orchestrator.submit(request).await;
    let job_id = record.job_id.to_string();

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            message: format!("Generation started for '{}'", record.title),
            status: "working".to_string(),
            job_status: format!("/jobs/{}", job_id),
            job_id,
            poll_latest: "/latest".to_string(),
            list_files: "/list".to_string(),
        }),
    ))
}

/// Build job submission routes
pub fn generate_routes() -> Router<AppState> {
    Router::new().route("/generate", post(generate))
}
