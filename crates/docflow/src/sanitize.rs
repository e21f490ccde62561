//! Helpers for rendering user-supplied file names safely.
//!
//! File names come straight from callers. Before they reach log lines or
//! object-store keys they are reduced to something printable and bounded.

const MAX_LOGGED_NAME: usize = 64;
const MAX_EXTENSION: usize = 8;
const FALLBACK_EXTENSION: &str = "bin";

/// Returns the final path component of `name` with control characters
/// replaced, truncated for log lines.
///
/// `../../etc/passwd` → `passwd`, `a\nb.pdf` → `a?b.pdf`.
pub fn redact_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("<unnamed>");

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() { '?' } else { c })
        .collect();

    if cleaned.chars().count() > MAX_LOGGED_NAME {
        let truncated: String = cleaned.chars().take(MAX_LOGGED_NAME).collect();
        format!("{}…", truncated)
    } else {
        cleaned
    }
}

/// Lowercase extension of `name` suitable for an object-store key.
///
/// Anything that is not a short ASCII alphanumeric extension becomes `bin`.
pub fn safe_extension(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= MAX_EXTENSION
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => FALLBACK_EXTENSION.to_string(),
    }
}
