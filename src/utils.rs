//! Utility functions for string handling and file system checks.
//!
//! - File-name sanitization for persisted articles
//! - String truncation for log fields
//! - Output directory validation

use crate::error::{Result, ScrapeError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Longest sanitized title kept in a file name.
const MAX_TITLE_CHARS: usize = 120;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("valid regex"));

/// Make an article title safe for use in a file name.
///
/// Every run of non-word characters becomes a single `-`. The result is
/// capped at 120 characters.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_title("Sensex @ 80,000!"), "Sensex-80-000-");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let mut safe = NON_WORD.replace_all(title, "-").into_owned();
    // Output is ASCII, so byte and char boundaries coincide.
    safe.truncate(MAX_TITLE_CHARS);
    safe
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then creates and removes a
/// probe file.
///
/// # Errors
///
/// [`ScrapeError::Persist`] if the directory cannot be created or written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|source| ScrapeError::Persist {
            path: path.to_path_buf(),
            source,
        })?;

    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(source) => Err(ScrapeError::Persist {
            path: probe_path,
            source,
        }),
    }
}
