//! Data models for lbai-studio
//!
//! - Job request as submitted over HTTP
//! - Job record: the pipeline state machine and job-status table row
//! - Artifacts produced by pipeline stages
//! - Typed fallback outcomes for optional stages

pub mod artifact;
pub mod job_record;
pub mod job_request;
pub mod outcome;

pub use artifact::{Artifact, ArtifactKind, ArtifactSet};
pub use job_record::{JobRecord, JobState, StateTransition};
pub use job_request::{JobRequest, VoiceType};
pub use outcome::{AssetOutcome, StageOutcome};
