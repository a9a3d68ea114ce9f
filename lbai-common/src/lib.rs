//! # LyricBeats Common Library
//!
//! Shared code for the LyricBeats services including:
//! - Common error type
//! - Root folder resolution and TOML bootstrap configuration
//! - Job event types and the EventBus
//! - Job identifier generation

pub mod config;
pub mod error;
pub mod events;
pub mod job_id;

pub use error::{Error, Result};
pub use job_id::JobId;
