//! Job-status table operations

use chrono::{DateTime, Utc};
use lbai_common::{Error, JobId, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{ArtifactSet, JobRecord, JobRequest, JobState};

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize {}: {}", what, e)))
}

fn from_json<T: serde::de::DeserializeOwned>(text: &str, what: &str) -> Result<T> {
    serde_json::from_str(text)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", what, e)))
}

fn parse_state(text: &str) -> Result<JobState> {
    JobState::parse(text).ok_or_else(|| Error::Internal(format!("Unknown job state: {}", text)))
}

fn parse_time(text: &str, what: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", what, e)))
}

/// Insert or update a job record
pub async fn save_job(pool: &SqlitePool, job: &JobRecord) -> Result<()> {
    let request = to_json(&job.request, "request")?;
    let artifacts = to_json(&job.artifacts, "artifacts")?;
    let fallbacks = to_json(&job.fallbacks, "fallbacks")?;
    let failed_stage = job.failed_stage.map(|s| s.as_str());

    sqlx::query(
        r#"
        INSERT INTO jobs (
            job_id, state, title, request, artifacts, error,
            failed_stage, fallbacks, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(job_id) DO UPDATE SET
            state = excluded.state,
            artifacts = excluded.artifacts,
            error = excluded.error,
            failed_stage = excluded.failed_stage,
            fallbacks = excluded.fallbacks,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(job.job_id.as_str())
    .bind(job.state.as_str())
    .bind(&job.title)
    .bind(&request)
    .bind(&artifacts)
    .bind(&job.error)
    .bind(failed_stage)
    .bind(&fallbacks)
    .bind(job.created_at.to_rfc3339())
    .bind(job.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

fn row_to_job(row: &SqliteRow) -> Result<JobRecord> {
    let state: String = row.get("state");
    let request: String = row.get("request");
    let artifacts: String = row.get("artifacts");
    let fallbacks: String = row.get("fallbacks");
    let failed_stage: Option<String> = row.get("failed_stage");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(JobRecord {
        job_id: JobId::from_raw(row.get::<String, _>("job_id")),
        title: row.get("title"),
        state: parse_state(&state)?,
        request: from_json::<JobRequest>(&request, "request")?,
        artifacts: from_json::<ArtifactSet>(&artifacts, "artifacts")?,
        error: row.get("error"),
        failed_stage: failed_stage.as_deref().map(parse_state).transpose()?,
        fallbacks: from_json(&fallbacks, "fallbacks")?,
        created_at: parse_time(&created_at, "created_at")?,
        updated_at: parse_time(&updated_at, "updated_at")?,
    })
}

/// Load one job record
pub async fn load_job(pool: &SqlitePool, job_id: &str) -> Result<Option<JobRecord>> {
    let row = sqlx::query(
        r#"
        SELECT job_id, state, title, request, artifacts, error,
               failed_stage, fallbacks, created_at, updated_at
        FROM jobs
        WHERE job_id = ?
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_job).transpose()
}

/// Most recent job records, newest first
pub async fn list_recent(pool: &SqlitePool, limit: u32) -> Result<Vec<JobRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT job_id, state, title, request, artifacts, error,
               failed_stage, fallbacks, created_at, updated_at
        FROM jobs
        ORDER BY created_at DESC, job_id DESC
        LIMIT ?
        "#,
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_job).collect()
}
