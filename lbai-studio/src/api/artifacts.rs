//! Artifact listing and download
//!
//! File names from the URL are reduced to their basename before lookup, so a
//! traversal attempt can only ever name a file inside the served directory.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path as FsPath, PathBuf};
use std::time::SystemTime;
use tokio_util::io::ReaderStream;

use crate::{
    api::jobs::ListQuery,
    error::{ApiError, ApiResult},
    utils::safe_filename,
    AppState,
};

/// One public artifact in GET /list
#[derive(Debug, Serialize)]
pub struct ArtifactEntry {
    pub name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub public_url: String,
    pub output_url: String,
}

struct DirEntryInfo {
    name: String,
    path: PathBuf,
    size_bytes: u64,
    modified: SystemTime,
}

/// Regular files in `dir`, newest first
async fn files_newest_first(dir: &FsPath) -> ApiResult<Vec<DirEntryInfo>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        files.push(DirEntryInfo {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
            size_bytes: metadata.len(),
            modified: metadata
                .created()
                .or_else(|_| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
    Ok(files)
}

fn content_type_for(path: &FsPath) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Stream a file as an attachment
async fn file_response(path: &FsPath) -> ApiResult<Response> {
    let file = tokio::fs::File::open(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().replace('"', ""))
        .unwrap_or_default();

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(path).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// Resolve a requested name inside `dir`
fn resolve_in(dir: &FsPath, requested: &str) -> ApiResult<PathBuf> {
    let name = safe_filename(requested)
        .ok_or_else(|| ApiError::NotFound(format!("File not found: {}", requested)))?;
    let path = dir.join(&name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ApiError::NotFound(format!("File not found: {}", name)))
    }
}

/// GET /latest
pub async fn latest(State(state): State<AppState>) -> ApiResult<Response> {
    let files = files_newest_first(&state.paths.public_dir).await?;
    let newest = files
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound("No generated file yet".to_string()))?;

    file_response(&newest.path).await
}

/// GET /list?limit=N
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ArtifactEntry>>> {
    let files = files_newest_first(&state.paths.public_dir).await?;

    let entries = files
        .into_iter()
        .take(query.effective_limit() as usize)
        .map(|f| ArtifactEntry {
            public_url: format!("/public/{}", f.name),
            output_url: format!("/download/{}", f.name),
            created_at: DateTime::<Utc>::from(f.modified),
            size_bytes: f.size_bytes,
            name: f.name,
        })
        .collect();

    Ok(Json(entries))
}

/// GET /public/{filename}
pub async fn public_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let path = resolve_in(&state.paths.public_dir, &filename)?;
    file_response(&path).await
}

/// GET /download/{filename}
pub async fn output_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let path = resolve_in(&state.paths.output_dir, &filename)?;
    file_response(&path).await
}

/// Build artifact routes
pub fn artifact_routes() -> Router<AppState> {
    Router::new()
        .route("/latest", get(latest))
        .route("/list", get(list))
        .route("/public/:filename", get(public_file))
        .route("/download/:filename", get(output_file))
}
