//! Job state machine and job-status record
//!
//! A job progresses linearly:
//! CREATED → ASSETS_SEARCHED → INSTRUMENTAL_READY → VOCALS_READY →
//! [CONVERTED_VOCALS_READY] → MIXED → VIDEOS_COMPOSED → PUBLISHED → LOGGED → DONE
//!
//! Any required stage may end the job in FAILED instead. There is no way back.

use chrono::{DateTime, Utc};
use lbai_common::JobId;
use serde::{Deserialize, Serialize};

use super::{ArtifactSet, JobRequest};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Created,
    AssetsSearched,
    InstrumentalReady,
    VocalsReady,
    /// Only entered when voice conversion actually ran
    ConvertedVocalsReady,
    Mixed,
    VideosComposed,
    Published,
    Logged,
    Done,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Created => "CREATED",
            JobState::AssetsSearched => "ASSETS_SEARCHED",
            JobState::InstrumentalReady => "INSTRUMENTAL_READY",
            JobState::VocalsReady => "VOCALS_READY",
            JobState::ConvertedVocalsReady => "CONVERTED_VOCALS_READY",
            JobState::Mixed => "MIXED",
            JobState::VideosComposed => "VIDEOS_COMPOSED",
            JobState::Published => "PUBLISHED",
            JobState::Logged => "LOGGED",
            JobState::Done => "DONE",
            JobState::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let state = match s {
            "CREATED" => JobState::Created,
            "ASSETS_SEARCHED" => JobState::AssetsSearched,
            "INSTRUMENTAL_READY" => JobState::InstrumentalReady,
            "VOCALS_READY" => JobState::VocalsReady,
            "CONVERTED_VOCALS_READY" => JobState::ConvertedVocalsReady,
            "MIXED" => JobState::Mixed,
            "VIDEOS_COMPOSED" => JobState::VideosComposed,
            "PUBLISHED" => JobState::Published,
            "LOGGED" => JobState::Logged,
            "DONE" => JobState::Done,
            "FAILED" => JobState::Failed,
            _ => return None,
        };
        Some(state)
    }

    /// Position in the linear pipeline. FAILED has no position.
    fn ordinal(&self) -> Option<u8> {
        match self {
            JobState::Created => Some(0),
            JobState::AssetsSearched => Some(1),
            JobState::InstrumentalReady => Some(2),
            JobState::VocalsReady => Some(3),
            JobState::ConvertedVocalsReady => Some(4),
            JobState::Mixed => Some(5),
            JobState::VideosComposed => Some(6),
            JobState::Published => Some(7),
            JobState::Logged => Some(8),
            JobState::Done => Some(9),
            JobState::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    /// Coarse status exposed to pollers
    pub fn status(&self) -> &'static str {
        match self {
            JobState::Done => "succeeded",
            JobState::Failed => "failed",
            _ => "pending",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub job_id: JobId,
    pub old_state: JobState,
    pub new_state: JobState,
    pub transitioned_at: DateTime<Utc>,
}

/// One row of the job-status table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub title: String,
    pub state: JobState,
    pub request: JobRequest,
    pub artifacts: ArtifactSet,

    /// Error message when FAILED
    pub error: Option<String>,

    /// State the job was in when the failing stage started
    pub failed_stage: Option<JobState>,

    /// Fallback reasons recorded by optional stages, in order
    pub fallbacks: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(job_id: JobId, request: JobRequest) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            title: request.title.clone(),
            state: JobState::Created,
            request,
            artifacts: ArtifactSet::new(),
            error: None,
            failed_stage: None,
            fallbacks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move forward to `new_state`
    ///
    /// Transitions only go forward; a backwards step is a programming error.
    pub fn transition_to(&mut self, new_state: JobState) -> StateTransition {
        debug_assert!(
            !self.state.is_terminal(),
            "transition out of terminal state {}",
            self.state
        );
        debug_assert!(
            match (self.state.ordinal(), new_state.ordinal()) {
                (Some(old), Some(new)) => new > old,
                _ => true,
            },
            "backwards transition {} -> {}",
            self.state,
            new_state
        );

        let transition = StateTransition {
            job_id: self.job_id.clone(),
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;
        self.updated_at = transition.transitioned_at;
        transition
    }

    /// Record a fatal error and move to FAILED
    pub fn fail(&mut self, error: impl Into<String>) -> StateTransition {
        self.failed_stage = Some(self.state);
        self.error = Some(error.into());
        self.transition_to(JobState::Failed)
    }

    pub fn record_fallback(&mut self, stage: &str, reason: &str) {
        self.fallbacks.push(format!("{}: {}", stage, reason));
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
