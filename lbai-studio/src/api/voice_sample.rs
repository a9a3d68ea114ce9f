//! Voice sample upload
//!
//! The upload is written to a temporary file and renamed over the stored
//! sample, so a rejected or interrupted upload leaves the previous sample
//! untouched.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// Multipart field carrying the sample
pub const VOICE_FIELD: &str = "voice";

/// POST /upload_voice response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub path: String,
}

fn is_wav_name(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".wav")
}

/// POST /upload_voice
pub async fn upload_voice(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed reading multipart field: {}", e)))?
    {
        if field.name() != Some(VOICE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.trim().is_empty() {
            return Err(ApiError::BadRequest("No file selected".to_string()));
        }
        if !is_wav_name(&file_name) {
            return Err(ApiError::BadRequest(format!(
                "Only .wav files are accepted: {}",
                file_name
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed reading voice sample: {}", e)))?;

        let target = state.paths.voice_sample_path();
        tokio::fs::create_dir_all(&state.paths.voice_samples_dir).await?;
        let partial = target.with_extension("wav.part");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, &target).await?;

        tracing::info!(
            file_name = %file_name,
            bytes = bytes.len(),
            path = %target.display(),
            "Voice sample stored"
        );

        return Ok(Json(UploadResponse {
            message: "uploaded".to_string(),
            path: target.display().to_string(),
        }));
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{}'",
        VOICE_FIELD
    )))
}

/// Build voice sample routes
pub fn voice_sample_routes() -> Router<AppState> {
    Router::new().route("/upload_voice", post(upload_voice))
}
