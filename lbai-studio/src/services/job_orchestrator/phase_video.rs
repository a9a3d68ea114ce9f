//! Phase 6: VIDEOS_COMPOSED
//!
//! Writes the lyrics sheet and renders the simple and high variants. The
//! composer handles background fallbacks itself; a render failure on a solid
//! background is fatal.

use super::{JobContext, JobOrchestrator};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{ArtifactKind, JobState};
use crate::services::video_composer::{BackgroundChoice, ComposeRequest, VideoMode};

impl JobOrchestrator {
    pub(super) async fn phase_videos(&self, ctx: &mut JobContext) -> PipelineResult<()> {
        ctx.stage = "video";
        let audio = ctx
            .record
            .artifacts
            .path(ArtifactKind::MixedAudio)
            .map(|p| p.to_path_buf())
            .ok_or_else(|| PipelineError::Media("Mixed audio missing".to_string()))?;

        let lyrics_path = self.artifact_path(&ctx.record, ArtifactKind::LyricsText);
        tokio::fs::write(&lyrics_path, ctx.record.request.lyrics.as_bytes()).await?;
        Self::add_artifact(&mut ctx.record, ArtifactKind::LyricsText, lyrics_path);

        let lyric_lines = ctx.record.request.lyric_lines();
        let title = ctx.record.request.title.clone();
        let image = ctx.image.url().map(str::to_string);
        let video = ctx.video.url().map(str::to_string);

        for (mode, kind) in [
            (VideoMode::Simple, ArtifactKind::SimpleVideo),
            (VideoMode::High, ArtifactKind::HighVideo),
        ] {
            let output = self.artifact_path(&ctx.record, kind);

            tracing::info!(
                job_id = %ctx.record.job_id,
                mode = mode.as_str(),
                "Composing video"
            );

            let composed = self
                .composer
                .compose(&ComposeRequest {
                    audio: &audio,
                    output: &output,
                    mode,
                    background_image: image.as_deref(),
                    background_video: video.as_deref(),
                    title: &title,
                    lyric_lines: &lyric_lines,
                })
                .await?;

            if let BackgroundChoice::Fallback { reason } = &composed.background {
                let stage = format!("{}_video_background", mode.as_str());
                self.note_fallback(&mut ctx.record, &stage, reason);
            }
            Self::add_artifact(&mut ctx.record, kind, composed.path);
        }

        self.advance(&mut ctx.record, JobState::VideosComposed).await;
        Ok(())
    }
}
