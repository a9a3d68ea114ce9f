//! File name sanitization for user-supplied names

/// Reduce `name` to its final path component
///
/// Both `/` and `\` count as separators. Returns `None` when nothing usable
/// is left (empty, `.` or `..`).
pub fn safe_filename(name: &str) -> Option<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    match base {
        "" | "." | ".." => None,
        other => Some(other.to_string()),
    }
}
