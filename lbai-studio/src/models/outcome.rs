//! Typed fallback results for optional stages
//!
//! A stage that may degrade returns one of these instead of swallowing the
//! error, so the orchestrator can log and record the reason.

use serde::{Deserialize, Serialize};

/// Result of a stage that always yields a value but may have used its fallback
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    /// The real capability produced the value
    Produced(T),
    /// The fallback produced the value
    Fallback { value: T, reason: String },
}

impl<T> StageOutcome<T> {
    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        StageOutcome::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Produced(value) | StageOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Produced(value) | StageOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            StageOutcome::Produced(_) => None,
            StageOutcome::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StageOutcome::Fallback { .. })
    }
}

/// Result of a background asset search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum AssetOutcome {
    Found(String),
    Unavailable(String),
}

impl AssetOutcome {
    pub fn url(&self) -> Option<&str> {
        match self {
            AssetOutcome::Found(url) => Some(url),
            AssetOutcome::Unavailable(_) => None,
        }
    }

    /// Value written to the generation log: the URL or `none`
    pub fn log_value(&self) -> &str {
        self.url().unwrap_or("none")
    }
}
