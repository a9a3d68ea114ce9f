//! Job orchestrator
//!
//! Runs one job through the pipeline state machine:
//!
//! CREATED → ASSETS_SEARCHED → INSTRUMENTAL_READY → VOCALS_READY →
//! [CONVERTED_VOCALS_READY] → MIXED → VIDEOS_COMPOSED → PUBLISHED → LOGGED → DONE
//!
//! Each state is reached by a dedicated `phase_*` method. Stages run strictly
//! in order within a job; separate jobs run in separate tasks and share
//! nothing but the public directory and the generation log.
//!
//! Optional stages record a fallback and continue. A required stage error
//! moves the job to FAILED and leaves partial artifacts on disk.

use crate::config::{PipelineSettings, StudioPaths};
use crate::db::jobs::save_job;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Artifact, ArtifactKind, AssetOutcome, JobRecord, JobRequest, JobState};
use crate::services::metadata_log::MetadataLogger;
use crate::services::mixer::Mixer;
use crate::services::providers::{MediaTools, Providers};
use crate::services::publisher::Publisher;
use crate::services::video_composer::VideoComposer;
use chrono::Utc;
use lbai_common::events::{EventBus, StudioEvent};
use lbai_common::JobId;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

mod phase_assets;
mod phase_audio;
mod phase_publish;
mod phase_video;

/// Per-job values handed from one phase to the next
struct JobContext {
    record: JobRecord,
    /// Stage currently running, reported on failure
    stage: &'static str,
    image: AssetOutcome,
    video: AssetOutcome,
    /// Voice track fed to the mixer (converted or original)
    foreground: Option<PathBuf>,
    /// Custom voice in effect and conversion requested
    convert_voice: bool,
}

impl JobContext {
    fn new(record: JobRecord) -> Self {
        Self {
            record,
            stage: "created",
            image: AssetOutcome::Unavailable("not searched".to_string()),
            video: AssetOutcome::Unavailable("not searched".to_string()),
            foreground: None,
            convert_voice: false,
        }
    }
}

/// Pipeline orchestrator service
pub struct JobOrchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    providers: Providers,
    mixer: Mixer,
    composer: VideoComposer,
    publisher: Publisher,
    logger: MetadataLogger,
    paths: StudioPaths,
    settings: PipelineSettings,
}

impl JobOrchestrator {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        providers: Providers,
        media: MediaTools,
        paths: StudioPaths,
        settings: PipelineSettings,
    ) -> Self {
        let mixer = Mixer::new(media.encoder, settings.mp3_bitrate.clone());
        let composer = VideoComposer::new(
            media.renderer,
            media.fetcher,
            settings.video,
            paths.output_dir.clone(),
        );
        let publisher = Publisher::new(paths.public_dir.clone(), providers.uploader.clone());
        let logger = MetadataLogger::new(paths.generation_log.clone());

        Self {
            db,
            event_bus,
            providers,
            mixer,
            composer,
            publisher,
            logger,
            paths,
            settings,
        }
    }

    pub fn paths(&self) -> &StudioPaths {
        &self.paths
    }

    /// Accept a job and start it in the background
    ///
    /// Returns as soon as the job row exists; the caller is not told about
    /// the outcome except through the job-status table and events.
    pub async fn submit(self: &Arc<Self>, request: JobRequest) -> JobRecord {
        let request = request.normalized();
        let job_id = JobId::generate(&request.title);
        let record = JobRecord::new(job_id.clone(), request);

        self.persist(&record).await;
        self.event_bus.emit_lossy(StudioEvent::JobAccepted {
            job_id: job_id.clone(),
            title: record.title.clone(),
            timestamp: Utc::now(),
        });

        tracing::info!(
            job_id = %job_id,
            title = %record.title,
            duration = record.request.duration,
            "Job accepted"
        );

        let orchestrator = Arc::clone(self);
        let job = record.clone();
        tokio::spawn(async move {
            orchestrator.execute_job(job).await;
        });

        record
    }

    /// Run every stage and return the terminal record
    pub async fn execute_job(&self, record: JobRecord) -> JobRecord {
        let start_time = std::time::Instant::now();
        let mut ctx = JobContext::new(record);

        tracing::info!(job_id = %ctx.record.job_id, "Starting pipeline");

        match self.run_pipeline(&mut ctx).await {
            Ok(()) => {
                self.advance(&mut ctx.record, JobState::Done).await;

                let duration_seconds = start_time.elapsed().as_secs();
                self.event_bus.emit_lossy(StudioEvent::JobCompleted {
                    job_id: ctx.record.job_id.clone(),
                    artifacts: ctx.record.artifacts.file_names(),
                    duration_seconds,
                    timestamp: Utc::now(),
                });

                tracing::info!(
                    job_id = %ctx.record.job_id,
                    artifacts = ctx.record.artifacts.len(),
                    fallbacks = ctx.record.fallbacks.len(),
                    duration_seconds,
                    "Job completed"
                );
            }
            Err(e) => self.handle_failure(&mut ctx, e).await,
        }

        ctx.record
    }

    async fn run_pipeline(&self, ctx: &mut JobContext) -> PipelineResult<()> {
        // Phase 1: background assets (optional)
        self.phase_assets(ctx).await?;

        // Phase 2-5: audio
        self.phase_instrumental(ctx).await?;
        self.phase_vocals(ctx).await?;
        self.phase_conversion(ctx).await?;
        self.phase_mix(ctx).await?;

        // Phase 6: videos
        self.phase_videos(ctx).await?;

        // Phase 7-8: publish and log (best effort)
        self.phase_publish(ctx).await?;
        self.phase_log(ctx).await?;

        Ok(())
    }

    async fn handle_failure(&self, ctx: &mut JobContext, error: PipelineError) {
        let message = error.to_string();
        tracing::error!(
            job_id = %ctx.record.job_id,
            stage = ctx.stage,
            error = %message,
            "Job failed, partial artifacts left in place"
        );

        ctx.record.fail(message.clone());
        self.persist(&ctx.record).await;

        self.event_bus.emit_lossy(StudioEvent::JobFailed {
            job_id: ctx.record.job_id.clone(),
            stage: ctx.stage.to_string(),
            error: message,
            timestamp: Utc::now(),
        });
    }

    /// Enter `state`: persist the row and broadcast the change
    async fn advance(&self, record: &mut JobRecord, state: JobState) {
        let transition = record.transition_to(state);
        self.persist(record).await;

        tracing::info!(
            job_id = %record.job_id,
            from = %transition.old_state,
            to = %transition.new_state,
            "Job state changed"
        );

        self.event_bus.emit_lossy(StudioEvent::JobStageChanged {
            job_id: record.job_id.clone(),
            stage: state.as_str().to_string(),
            timestamp: transition.transitioned_at,
        });
    }

    /// Record an optional stage's degradation
    fn note_fallback(&self, record: &mut JobRecord, stage: &str, reason: &str) {
        tracing::warn!(
            job_id = %record.job_id,
            stage,
            reason,
            "Stage fell back"
        );
        record.record_fallback(stage, reason);

        self.event_bus.emit_lossy(StudioEvent::JobFallback {
            job_id: record.job_id.clone(),
            stage: stage.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn artifact_path(&self, record: &JobRecord, kind: ArtifactKind) -> PathBuf {
        kind.path_for(&self.paths.output_dir, &record.job_id)
    }

    fn add_artifact(record: &mut JobRecord, kind: ArtifactKind, path: PathBuf) {
        let job_id = record.job_id.clone();
        record.artifacts.push(Artifact { kind, path, job_id });
    }

    /// Job-status writes never abort a job
    async fn persist(&self, record: &JobRecord) {
        if let Err(e) = save_job(&self.db, record).await {
            tracing::warn!(
                job_id = %record.job_id,
                error = %e,
                "Failed to save job status"
            );
        }
    }
}
