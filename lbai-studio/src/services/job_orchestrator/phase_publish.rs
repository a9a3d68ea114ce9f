//! Phases 7-8: PUBLISHED, LOGGED
//!
//! Both are best effort. Copy, upload and log-write failures are recorded as
//! fallbacks and never fail the job.

use super::{JobContext, JobOrchestrator};
use crate::error::PipelineResult;
use crate::models::{ArtifactKind, JobRecord, JobState};
use crate::services::metadata_log::GenerationLogRecord;
use std::path::PathBuf;

/// Artifacts delivered to the public directory and remote storage
fn published_kinds(file_format: &str) -> Vec<ArtifactKind> {
    let mut kinds = vec![
        ArtifactKind::MixedAudio,
        ArtifactKind::SimpleVideo,
        ArtifactKind::HighVideo,
    ];
    if file_format == "wav" {
        kinds.push(ArtifactKind::MixedWav);
    }
    kinds
}

/// Artifact named in the generation log for `file_format`
fn primary_kind(file_format: &str) -> ArtifactKind {
    match file_format {
        "simple_mp4" => ArtifactKind::SimpleVideo,
        "high_mp4" => ArtifactKind::HighVideo,
        "wav" => ArtifactKind::MixedWav,
        _ => ArtifactKind::MixedAudio,
    }
}

impl JobOrchestrator {
    pub(super) async fn phase_publish(&self, ctx: &mut JobContext) -> PipelineResult<()> {
        ctx.stage = "publish";
        let files: Vec<PathBuf> = published_kinds(&ctx.record.request.file_format)
            .into_iter()
            .filter_map(|kind| ctx.record.artifacts.path(kind).map(|p| p.to_path_buf()))
            .collect();

        let report = self.publisher.publish(&files).await;

        tracing::info!(
            job_id = %ctx.record.job_id,
            copied = report.public_paths().len(),
            uploaded = report.uploaded(),
            "Artifacts published"
        );

        for failure in report.failures() {
            self.note_fallback(&mut ctx.record, ctx.stage, failure);
        }

        self.advance(&mut ctx.record, JobState::Published).await;
        Ok(())
    }

    pub(super) async fn phase_log(&self, ctx: &mut JobContext) -> PipelineResult<()> {
        ctx.stage = "log";
        let entry = GenerationLogRecord {
            job_id: ctx.record.job_id.clone(),
            title: ctx.record.title.clone(),
            file_format: ctx.record.request.file_format.clone(),
            file_path: self.primary_file(&ctx.record),
            pic: ctx.image.log_value().to_string(),
            video: ctx.video.log_value().to_string(),
            lyrics_len: ctx.record.request.lyrics.chars().count(),
        };

        if let Err(e) = self.logger.append(&entry).await {
            let reason = format!("{}: {}", self.logger.path().display(), e);
            self.note_fallback(&mut ctx.record, ctx.stage, &reason);
        }

        self.advance(&mut ctx.record, JobState::Logged).await;
        Ok(())
    }

    /// Public copy of the primary artifact, else its output path
    fn primary_file(&self, record: &JobRecord) -> PathBuf {
        let kind = primary_kind(&record.request.file_format);
        let output = self.artifact_path(record, kind);

        let public = output
            .file_name()
            .map(|name| self.publisher.public_dir().join(name));
        match public {
            Some(path) if path.is_file() => path,
            _ => record
                .artifacts
                .path(kind)
                .map(|p| p.to_path_buf())
                .unwrap_or(output),
        }
    }
}
