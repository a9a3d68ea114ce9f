//! Voice conversion (optional stage)
//!
//! Re-timbres a sung vocal track towards a target voice model. The concrete
//! converter shells out to an external inference script and is only compiled
//! with the `voice-conversion` feature.

use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Voice conversion capability
#[async_trait]
pub trait VoiceConverter: Send + Sync {
    /// Convert `input` into `output` using `model`
    ///
    /// Fails with `Configuration` when `model` is `None`.
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        model: Option<&Path>,
    ) -> PipelineResult<PathBuf>;
}

/// Whether the conversion stage is compiled into this build
pub const fn conversion_compiled_in() -> bool {
    cfg!(feature = "voice-conversion")
}

/// Runs `{command} --model {model} --in {input} --out {output}`
#[cfg(feature = "voice-conversion")]
#[derive(Debug, Clone)]
pub struct CommandVoiceConverter {
    program: String,
    leading_args: Vec<String>,
}

#[cfg(feature = "voice-conversion")]
impl CommandVoiceConverter {
    /// `command` is split on whitespace: `"python rvc_infer.py"`
    pub fn new(command: &str) -> PipelineResult<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            PipelineError::Configuration("Voice conversion command is empty".to_string())
        })?;
        Ok(Self {
            program,
            leading_args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[cfg(feature = "voice-conversion")]
#[async_trait]
impl VoiceConverter for CommandVoiceConverter {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        model: Option<&Path>,
    ) -> PipelineResult<PathBuf> {
        let model = model.ok_or_else(|| {
            PipelineError::Configuration(
                "Voice conversion model path not configured (set RVC_MODEL_PATH)".to_string(),
            )
        })?;

        tracing::info!(
            program = %self.program,
            model = %model.display(),
            input = %input.display(),
            "Running voice conversion"
        );

        let result = tokio::process::Command::new(&self.program)
            .args(&self.leading_args)
            .arg("--model")
            .arg(model)
            .arg("--in")
            .arg(input)
            .arg("--out")
            .arg(output)
            .output()
            .await
            .map_err(|e| {
                PipelineError::ProviderUnavailable(format!(
                    "Failed to execute {}: {}",
                    self.program, e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(PipelineError::Provider(format!(
                "Voice conversion exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        if !output.is_file() {
            return Err(PipelineError::Provider(format!(
                "Voice conversion produced no file at {}",
                output.display()
            )));
        }

        Ok(output.to_path_buf())
    }
}
