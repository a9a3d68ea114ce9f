//! Pipeline artifacts
//!
//! Every artifact is a file created by exactly one stage and never mutated
//! afterwards. All artifact file names of a job are derived from its JobId.

use lbai_common::JobId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a stage produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Instrumental,
    Vocals,
    ConvertedVocals,
    /// Uncompressed mix the MP3 is encoded from
    MixedWav,
    MixedAudio,
    SimpleVideo,
    HighVideo,
    LyricsText,
}

impl ArtifactKind {
    /// File name suffix appended to the job identifier
    pub fn file_suffix(&self) -> &'static str {
        match self {
            ArtifactKind::Instrumental => "beat.wav",
            ArtifactKind::Vocals => "vocals.wav",
            ArtifactKind::ConvertedVocals => "vocals_converted.wav",
            ArtifactKind::MixedWav => "mix.wav",
            ArtifactKind::MixedAudio => "FINAL.mp3",
            ArtifactKind::SimpleVideo => "FINAL_simple.mp4",
            ArtifactKind::HighVideo => "FINAL_high.mp4",
            ArtifactKind::LyricsText => "lyrics.txt",
        }
    }

    /// Deterministic path of this artifact for `job_id` inside `dir`
    pub fn path_for(&self, dir: &Path, job_id: &JobId) -> PathBuf {
        dir.join(job_id.artifact_name(self.file_suffix()))
    }
}

/// A file on persistent storage owned by one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub job_id: JobId,
}

impl Artifact {
    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Artifacts of one job in creation order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactSet {
    items: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an artifact. A kind is only ever produced once per job.
    pub fn push(&mut self, artifact: Artifact) {
        debug_assert!(
            self.get(artifact.kind).is_none(),
            "artifact kind produced twice: {:?}",
            artifact.kind
        );
        self.items.push(artifact);
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.items.iter().find(|a| a.kind == kind)
    }

    pub fn path(&self, kind: ArtifactKind) -> Option<&Path> {
        self.get(kind).map(|a| a.path.as_path())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.items.iter().filter_map(Artifact::file_name).collect()
    }
}
