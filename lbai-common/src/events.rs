//! Event types for the LyricBeats event system
//!
//! Provides shared event definitions and the EventBus used to fan job
//! progress out to SSE clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::JobId;

/// Job lifecycle events
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StudioEvent {
    /// Job accepted by the HTTP layer, background task about to start
    JobAccepted {
        job_id: JobId,
        title: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Job entered a new pipeline state
    JobStageChanged {
        job_id: JobId,
        /// State name (e.g. "INSTRUMENTAL_READY")
        stage: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An optional stage degraded to its fallback
    JobFallback {
        job_id: JobId,
        stage: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Job finished with all artifacts written
    JobCompleted {
        job_id: JobId,
        /// Artifact file names (not full paths)
        artifacts: Vec<String>,
        duration_seconds: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A required stage failed; partial artifacts stay on disk
    JobFailed {
        job_id: JobId,
        stage: String,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl StudioEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            StudioEvent::JobAccepted { .. } => "JobAccepted",
            StudioEvent::JobStageChanged { .. } => "JobStageChanged",
            StudioEvent::JobFallback { .. } => "JobFallback",
            StudioEvent::JobCompleted { .. } => "JobCompleted",
            StudioEvent::JobFailed { .. } => "JobFailed",
        }
    }

    pub fn job_id(&self) -> &JobId {
        match self {
            StudioEvent::JobAccepted { job_id, .. }
            | StudioEvent::JobStageChanged { job_id, .. }
            | StudioEvent::JobFallback { job_id, .. }
            | StudioEvent::JobCompleted { job_id, .. }
            | StudioEvent::JobFailed { job_id, .. } => job_id,
        }
    }
}

/// Broadcast bus for StudioEvents
///
/// Cloning the bus shares the underlying channel. Subscribers only see events
/// emitted after they subscribed; slow subscribers lose the oldest events once
/// `capacity` is exceeded.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StudioEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: StudioEvent,
    ) -> Result<usize, broadcast::error::SendError<StudioEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: StudioEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(id: &str) -> StudioEvent {
        StudioEvent::JobAccepted {
            job_id: JobId::from_raw(id),
            title: "Test Song".to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(accepted("Test_Song_20260101_000000_abc123")).unwrap();
        assert_eq!(json["type"], "JobAccepted");
        assert_eq!(json["job_id"], "Test_Song_20260101_000000_abc123");
        assert_eq!(json["title"], "Test Song");
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        assert!(bus.emit(accepted("x")).is_err());
        // lossy variant never panics
        bus.emit_lossy(accepted("x"));
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit_lossy(accepted("first"));
        bus.emit_lossy(StudioEvent::JobStageChanged {
            job_id: JobId::from_raw("first"),
            stage: "MIXED".to_string(),
            timestamp: chrono::Utc::now(),
        });

        let e1 = rx.recv().await.unwrap();
        let e2 = rx.recv().await.unwrap();
        assert_eq!(e1.event_type(), "JobAccepted");
        assert_eq!(e2.event_type(), "JobStageChanged");
        assert_eq!(e2.job_id().as_str(), "first");
    }
}
