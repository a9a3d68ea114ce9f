//! ffmpeg-backed media tools
//!
//! Implements `AudioEncoder` (WAV → MP3) and `VideoRenderer` (composition
//! plan → H.264/AAC MP4) by running the ffmpeg binary.

use crate::error::{PipelineError, PipelineResult};
use crate::services::mixer::AudioEncoder;
use crate::services::video_composer::{Background, CompositionPlan, OverlayPosition, VideoRenderer};
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Margin between bottom captions and the frame edge (pixels)
const BOTTOM_MARGIN: u32 = 40;

/// Number of stderr lines kept in error messages
const STDERR_TAIL_LINES: usize = 8;

#[derive(Debug, Clone)]
pub struct FfmpegClient {
    ffmpeg_path: PathBuf,
}

impl FfmpegClient {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    /// Check that the binary runs; logs the version line
    pub async fn check_available(&self) -> PipelineResult<String> {
        let output = tokio::process::Command::new(&self.ffmpeg_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| {
                PipelineError::Media(format!(
                    "Failed to execute {}: {}",
                    self.ffmpeg_path.display(),
                    e
                ))
            })?;

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(version)
    }

    async fn run(&self, args: Vec<OsString>) -> PipelineResult<()> {
        tracing::debug!(
            ffmpeg = %self.ffmpeg_path.display(),
            args = ?args,
            "Running ffmpeg"
        );

        let output = tokio::process::Command::new(&self.ffmpeg_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                PipelineError::Media(format!(
                    "Failed to execute {}: {}",
                    self.ffmpeg_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            return Err(PipelineError::Media(format!(
                "ffmpeg exited with {}: {}",
                output.status, tail
            )));
        }

        Ok(())
    }
}

fn os<S: AsRef<OsStr>>(s: S) -> OsString {
    s.as_ref().to_os_string()
}

/// Escape a filter option value for a `-filter_complex` graph
///
/// ffmpeg unescapes twice: once when splitting the option list of a filter,
/// once when parsing the graph description. The value is escaped for the
/// option level first, then for the graph level.
fn escape_filter_value(value: &str) -> String {
    let option_level = backslash_escape(value, &['\\', '\'', ':']);
    backslash_escape(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

fn backslash_escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn overlay_text_path(output: &Path, index: usize) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    output.with_file_name(format!("{}_overlay{}.txt", stem, index))
}

/// Build the ffmpeg argument list for a plan
///
/// Overlay text is read from `overlay_files` (one per overlay, same order).
pub fn render_args(plan: &CompositionPlan, overlay_files: &[PathBuf]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![os("-y"), os("-hide_banner")];
    let duration = format!("{:.3}", plan.duration_seconds);

    match &plan.background {
        Background::SolidColor(color) => {
            args.extend([
                os("-f"),
                os("lavfi"),
                os("-i"),
                os(format!(
                    "color=c={}:s={}x{}:r={}:d={}",
                    color, plan.width, plan.height, plan.fps, duration
                )),
            ]);
        }
        Background::Image(path) => {
            args.extend([os("-loop"), os("1"), os("-i"), os(path)]);
        }
        Background::Video(path) => {
            args.extend([
                os("-stream_loop"),
                os("-1"),
                os("-i"),
                os(path),
            ]);
        }
    }

    args.extend([os("-i"), os(&plan.audio)]);

    let mut filter = format!(
        "[0:v]scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
        w = plan.width,
        h = plan.height
    );
    for (overlay, file) in plan.overlays.iter().zip(overlay_files) {
        let y = match overlay.position {
            OverlayPosition::Center => "(h-text_h)/2".to_string(),
            OverlayPosition::BottomCenter => format!("h-text_h-{}", BOTTOM_MARGIN),
        };
        filter.push_str(&format!(
            ",drawtext=textfile={}:expansion=none:fontcolor={}:fontsize={}:x=(w-text_w)/2:y={}",
            escape_filter_value(&file.to_string_lossy()),
            overlay.color,
            overlay.font_size,
            y
        ));
    }
    filter.push_str("[v]");

    args.extend([
        os("-filter_complex"),
        os(&filter),
        os("-map"),
        os("[v]"),
        os("-map"),
        os("1:a"),
        os("-c:v"),
        os("libx264"),
        os("-pix_fmt"),
        os("yuv420p"),
        os("-r"),
        os(plan.fps.to_string()),
        os("-c:a"),
        os("aac"),
        os("-b:a"),
        os("192k"),
        os("-t"),
        os(&duration),
        os(&plan.output),
    ]);

    args
}

#[async_trait]
impl AudioEncoder for FfmpegClient {
    async fn encode_mp3(
        &self,
        input_wav: &Path,
        output: &Path,
        bitrate: &str,
    ) -> PipelineResult<()> {
        let args: Vec<OsString> = vec![
            os("-y"),
            os("-hide_banner"),
            os("-i"),
            os(input_wav),
            os("-c:a"),
            os("libmp3lame"),
            os("-b:a"),
            os(bitrate),
            os(output),
        ];
        self.run(args).await
    }
}

#[async_trait]
impl VideoRenderer for FfmpegClient {
    async fn render(&self, plan: &CompositionPlan) -> PipelineResult<()> {
        let mut overlay_files = Vec::with_capacity(plan.overlays.len());
        for (index, overlay) in plan.overlays.iter().enumerate() {
            let path = overlay_text_path(&plan.output, index);
            tokio::fs::write(&path, &overlay.text).await?;
            overlay_files.push(path);
        }

        let result = self.run(render_args(plan, &overlay_files)).await;

        for path in &overlay_files {
            let _ = tokio::fs::remove_file(path).await;
        }

        result
    }
}
