//! HTTP API handlers for lbai-studio
//!
//! Job submission returns immediately; progress is observable through the
//! job-status routes, the public artifact listing and the SSE stream.

pub mod artifacts;
pub mod generate;
pub mod health;
pub mod jobs;
pub mod sse;
pub mod voice_sample;

pub use artifacts::artifact_routes;
pub use generate::generate_routes;
pub use health::health_routes;
pub use jobs::job_routes;
pub use sse::event_stream;
pub use voice_sample::voice_sample_routes;
