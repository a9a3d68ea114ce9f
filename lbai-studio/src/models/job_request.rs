//! Job request as submitted to POST /generate
//!
//! Every field is optional on the wire; absent fields take the defaults below.
//! A request is immutable once the job is accepted.

use serde::{Deserialize, Serialize};

/// Lower bound for requested duration (seconds)
pub const MIN_DURATION_SECONDS: u32 = 1;
/// Upper bound for requested duration (seconds)
pub const MAX_DURATION_SECONDS: u32 = 300;

/// Voice selector for vocal synthesis
///
/// Unknown strings deserialize to `Default`; `clone` is an alias of `custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum VoiceType {
    #[default]
    Default,
    Male,
    Female,
    /// Clone the uploaded voice sample
    Custom,
}

impl From<String> for VoiceType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => VoiceType::Male,
            "female" => VoiceType::Female,
            "custom" | "clone" => VoiceType::Custom,
            _ => VoiceType::Default,
        }
    }
}

impl VoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceType::Default => "default",
            VoiceType::Male => "male",
            VoiceType::Female => "female",
            VoiceType::Custom => "custom",
        }
    }

    /// Singer description prepended to each vocal prompt
    pub fn style_prompt(&self) -> &'static str {
        match self {
            VoiceType::Male => "deep male singer",
            VoiceType::Female => "female soulful singer",
            VoiceType::Default | VoiceType::Custom => "male singer",
        }
    }
}

/// Song generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_lyrics")]
    pub lyrics: String,

    #[serde(default = "default_genre")]
    pub genre: String,

    #[serde(default)]
    pub voice_type: VoiceType,

    /// File name of a sample inside the voice-samples directory.
    /// Only the basename is honored. Defaults to the last uploaded sample.
    #[serde(default)]
    pub voice_sample: Option<String>,

    /// Instrumental length in seconds
    #[serde(default = "default_duration")]
    pub duration: u32,

    /// Primary deliverable: "mp3", "wav", "simple_mp4" or "high_mp4"
    #[serde(default = "default_file_format")]
    pub file_format: String,

    /// Run voice conversion when the custom voice is selected
    #[serde(default = "default_true", alias = "use_rvc")]
    pub use_voice_conversion: bool,
}

fn default_title() -> String {
    "My Hit Song".to_string()
}

fn default_lyrics() -> String {
    "Yeah yeah".to_string()
}

fn default_genre() -> String {
    "hip-hop".to_string()
}

fn default_duration() -> u32 {
    30
}

fn default_file_format() -> String {
    "mp3".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for JobRequest {
    fn default() -> Self {
        Self {
            title: default_title(),
            lyrics: default_lyrics(),
            genre: default_genre(),
            voice_type: VoiceType::Default,
            voice_sample: None,
            duration: default_duration(),
            file_format: default_file_format(),
            use_voice_conversion: true,
        }
    }
}

impl JobRequest {
    /// Clamp out-of-range values and normalize the format tag
    pub fn normalized(mut self) -> Self {
        self.duration = self.duration.clamp(MIN_DURATION_SECONDS, MAX_DURATION_SECONDS);
        self.file_format = self.file_format.trim().to_ascii_lowercase();
        if self.file_format.is_empty() {
            self.file_format = default_file_format();
        }
        self
    }

    /// Prompt for the instrumental model
    pub fn instrumental_prompt(&self) -> String {
        format!("{} instrumental", self.genre)
    }

    /// Search query for background assets
    pub fn asset_query(&self) -> String {
        format!("{} {}", self.title, self.genre)
    }

    /// Non-empty, trimmed lyric lines in order
    pub fn lyric_lines(&self) -> Vec<String> {
        self.lyrics
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}
