//! Utility functions for URL validation, filename sanitizing, logging and
//! output directory checks.

use crate::error::{ArchiveError, Result};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Longest sanitized title kept in a filename, in characters.
const MAX_TITLE_CHARS: usize = 150;

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` bytes (backed off to a character boundary)
/// with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Normalize a user-supplied publication URL to its root.
///
/// Adds `https://` when no scheme is given, rejects non-HTTP schemes and
/// hostless URLs, and drops any path, query or fragment, so both
/// `example.substack.com/archive?sort=new` and `https://example.substack.com/`
/// become `https://example.substack.com`.
pub fn validate_root_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let invalid = |reason: &str| ArchiveError::InvalidUrl {
        url: input.to_string(),
        reason: reason.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid("empty url"));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    let host = parsed.host_str().ok_or_else(|| invalid("missing host"))?;

    let root = match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    };
    Ok(root)
}

/// Turn an article title into a filesystem-safe filename stem.
///
/// Strips characters that are reserved on common filesystems and control
/// characters, collapses whitespace, trims trailing dots and spaces, and caps
/// the length.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_filename("What's next? A/B testing"), "What's next AB testing");
/// ```
pub fn clean_filename(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(MAX_TITLE_CHARS).collect();
    capped.trim_end_matches(['.', ' ']).to_string()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then creates and immediately
/// deletes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::write(&probe_path, b"").await?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Output directory is writable");
    Ok(())
}
