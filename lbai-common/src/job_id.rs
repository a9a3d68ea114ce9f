//! Job identifiers
//!
//! A job identifier namespaces every artifact a job writes:
//! `<sanitized title prefix>_<YYYYmmdd_HHMMSS>_<6 random [a-z0-9]>`.

use chrono::{DateTime, Local};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of the title-derived prefix
pub const TITLE_PREFIX_LEN: usize = 25;

/// Length of the random suffix
pub const SUFFIX_LEN: usize = 6;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Opaque, filesystem-safe job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// New identifier for `title` stamped with the current local time
    pub fn generate(title: &str) -> Self {
        Self::generate_at(title, Local::now(), &mut rand::thread_rng())
    }

    /// Deterministic variant for a given clock reading and RNG
    pub fn generate_at<R: Rng + ?Sized>(title: &str, now: DateTime<Local>, rng: &mut R) -> Self {
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect();

        JobId(format!(
            "{}_{}_{}",
            sanitize_title(title),
            now.format("%Y%m%d_%H%M%S"),
            suffix
        ))
    }

    /// Wrap an existing identifier string (e.g. loaded from the database)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        JobId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for an artifact owned by this job: `<id>_<suffix>`
    pub fn artifact_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.0, suffix)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replace every non-alphanumeric character with `_` and keep the first 25
///
/// Only ASCII alphanumerics survive so the prefix is safe on every filesystem.
/// A title with nothing left becomes `untitled`.
pub fn sanitize_title(title: &str) -> String {
    let prefix: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(TITLE_PREFIX_LEN)
        .collect();

    if prefix.is_empty() {
        "untitled".to_string()
    } else {
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sanitize_replaces_punctuation_and_spaces() {
        assert_eq!(sanitize_title("Test Song"), "Test_Song");
        assert_eq!(sanitize_title("Don't Stop!"), "Don_t_Stop_");
        assert_eq!(sanitize_title("../../etc"), "______etc");
    }

    #[test]
    fn test_sanitize_truncates_to_prefix_len() {
        let long = "a".repeat(100);
        assert_eq!(sanitize_title(&long).len(), TITLE_PREFIX_LEN);
    }

    #[test]
    fn test_sanitize_empty_title() {
        assert_eq!(sanitize_title(""), "untitled");
    }

    #[test]
    fn test_generate_at_layout() {
        let now = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let id = JobId::generate_at("Test Song", now, &mut rng);

        let s = id.as_str();
        assert!(s.starts_with("Test_Song_20260304_050607_"), "got {}", s);
        let suffix = &s[s.len() - SUFFIX_LEN..];
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_same_title_different_ids() {
        let a = JobId::generate("Test Song");
        let b = JobId::generate("Test Song");
        assert_ne!(a, b);
        assert_ne!(a.artifact_name("FINAL.mp3"), b.artifact_name("FINAL.mp3"));
    }

    #[test]
    fn test_artifact_name() {
        let id = JobId::from_raw("abc");
        assert_eq!(id.artifact_name("beat.wav"), "abc_beat.wav");
    }
}
