//! Phases 2-5: INSTRUMENTAL_READY, VOCALS_READY, CONVERTED_VOCALS_READY, MIXED
//!
//! The instrumental and vocal stages always leave a waveform behind: either
//! the provider's output or a silent placeholder of the requested duration.
//! Conversion is skipped or passed through; only the mix is strictly
//! required.

use super::{JobContext, JobOrchestrator};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{ArtifactKind, JobState, VoiceType};
use crate::services::instrumental::synthesize_or_silence;
use crate::services::vocals::{resolve_voice, synthesize_vocals, VocalJob};
use crate::services::voice_converter::conversion_compiled_in;

impl JobOrchestrator {
    pub(super) async fn phase_instrumental(&self, ctx: &mut JobContext) -> PipelineResult<()> {
        ctx.stage = "instrumental";
        let output = self.artifact_path(&ctx.record, ArtifactKind::Instrumental);
        let prompt = ctx.record.request.instrumental_prompt();

        tracing::info!(
            job_id = %ctx.record.job_id,
            provider = self.providers.instrumental.name(),
            prompt = %prompt,
            "Generating instrumental"
        );

        let outcome = synthesize_or_silence(
            self.providers.instrumental.as_ref(),
            &prompt,
            ctx.record.request.duration,
            &output,
        )
        .await?;

        if let Some(reason) = outcome.fallback_reason() {
            self.note_fallback(&mut ctx.record, ctx.stage, reason);
        }
        Self::add_artifact(&mut ctx.record, ArtifactKind::Instrumental, outcome.into_value());

        self.advance(&mut ctx.record, JobState::InstrumentalReady).await;
        Ok(())
    }

    pub(super) async fn phase_vocals(&self, ctx: &mut JobContext) -> PipelineResult<()> {
        ctx.stage = "vocals";
        let output = self.artifact_path(&ctx.record, ArtifactKind::Vocals);

        let sample = self
            .paths
            .voice_sample_for(ctx.record.request.voice_sample.as_deref());
        let (voice, reference) = resolve_voice(ctx.record.request.voice_type, &sample);
        if voice != ctx.record.request.voice_type {
            let reason = format!(
                "voice sample {} missing, using {} voice",
                sample.display(),
                voice.as_str()
            );
            self.note_fallback(&mut ctx.record, "voice_selection", &reason);
        }

        tracing::info!(
            job_id = %ctx.record.job_id,
            provider = self.providers.vocals.name(),
            voice = voice.as_str(),
            "Generating vocals"
        );

        let job = VocalJob {
            lyrics: &ctx.record.request.lyrics,
            voice,
            reference_sample: reference.as_deref(),
            max_chunk_chars: self.settings.lyric_chunk_chars,
            fallback_seconds: ctx.record.request.duration,
        };
        let outcome = synthesize_vocals(self.providers.vocals.as_ref(), &job, &output).await?;

        if let Some(reason) = outcome.fallback_reason() {
            self.note_fallback(&mut ctx.record, ctx.stage, reason);
        }
        let vocals = outcome.into_value();
        Self::add_artifact(&mut ctx.record, ArtifactKind::Vocals, vocals.clone());
        ctx.foreground = Some(vocals);

        // Conversion follows the effective voice, not the requested one
        ctx.convert_voice = voice == VoiceType::Custom && ctx.record.request.use_voice_conversion;

        self.advance(&mut ctx.record, JobState::VocalsReady).await;
        Ok(())
    }

    /// Optional; leaves `ctx.foreground` on the original vocals unless a
    /// conversion succeeds
    pub(super) async fn phase_conversion(&self, ctx: &mut JobContext) -> PipelineResult<()> {
        ctx.stage = "voice_conversion";

        if !ctx.convert_voice {
            tracing::debug!(job_id = %ctx.record.job_id, "Voice conversion not requested");
            return Ok(());
        }
        if !conversion_compiled_in() {
            tracing::debug!(job_id = %ctx.record.job_id, "Voice conversion not compiled in");
            return Ok(());
        }
        let Some(converter) = &self.providers.voice_converter else {
            tracing::debug!(job_id = %ctx.record.job_id, "Voice conversion not available");
            return Ok(());
        };
        let Some(input) = ctx.foreground.clone() else {
            return Ok(());
        };

        let output = self.artifact_path(&ctx.record, ArtifactKind::ConvertedVocals);
        let model = self.settings.voice_model_path.as_deref();

        tracing::info!(job_id = %ctx.record.job_id, "Converting voice");

        match converter.convert(&input, &output, model).await {
            Ok(converted) => {
                Self::add_artifact(&mut ctx.record, ArtifactKind::ConvertedVocals, converted.clone());
                ctx.foreground = Some(converted);
                self.advance(&mut ctx.record, JobState::ConvertedVocalsReady)
                    .await;
            }
            Err(e) => {
                let reason = format!("{}; using unconverted vocals", e);
                self.note_fallback(&mut ctx.record, ctx.stage, &reason);
            }
        }

        Ok(())
    }

    pub(super) async fn phase_mix(&self, ctx: &mut JobContext) -> PipelineResult<()> {
        ctx.stage = "mix";
        let background = ctx
            .record
            .artifacts
            .path(ArtifactKind::Instrumental)
            .map(|p| p.to_path_buf())
            .ok_or_else(|| PipelineError::Audio("Instrumental track missing".to_string()))?;
        let foreground = ctx
            .foreground
            .clone()
            .ok_or_else(|| PipelineError::Audio("Vocal track missing".to_string()))?;

        let wav_path = self.artifact_path(&ctx.record, ArtifactKind::MixedWav);
        let output = self.artifact_path(&ctx.record, ArtifactKind::MixedAudio);

        tracing::info!(job_id = %ctx.record.job_id, "Mixing audio");

        let mix = self
            .mixer
            .mix(
                &background,
                &foreground,
                &wav_path,
                &output,
                self.settings.vocals_gain_db,
            )
            .await?;

        tracing::info!(
            job_id = %ctx.record.job_id,
            duration_seconds = format!("{:.2}", mix.duration_seconds),
            "Mix ready"
        );

        Self::add_artifact(&mut ctx.record, ArtifactKind::MixedWav, mix.wav_path);
        Self::add_artifact(&mut ctx.record, ArtifactKind::MixedAudio, mix.encoded_path);

        self.advance(&mut ctx.record, JobState::Mixed).await;
        Ok(())
    }
}
