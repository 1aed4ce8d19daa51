//! JSON output: one file per article.
//!
//! # Output Structure
//!
//! ```text
//! folder/
//! ├── 1724415180-Wipro-margins-expand.json
//! └── 1724416200-Sensex-rallies-800-points.json
//! ```
//!
//! File names are `<unix timestamp>-<sanitized title>.json`, so an article
//! scraped twice overwrites its earlier record.

use crate::error::{Result, ScrapeError};
use crate::models::Article;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

/// Serialize `article` into `folder`, creating the folder if needed.
///
/// # Returns
///
/// The path written.
///
/// # Errors
///
/// [`ScrapeError::Serialize`] or [`ScrapeError::Persist`]; both end the run.
#[instrument(level = "debug", skip_all, fields(folder = %folder.display()))]
pub async fn write_article(article: &Article, folder: &Path) -> Result<PathBuf> {
    let json = serde_json::to_vec(article)?;

    fs::create_dir_all(folder)
        .await
        .map_err(|source| ScrapeError::Persist {
            path: folder.to_path_buf(),
            source,
        })?;

    let path = folder.join(format!("{}.json", article.file_stem()));
    fs::write(&path, json)
        .await
        .map_err(|source| ScrapeError::Persist {
            path: path.clone(),
            source,
        })?;
    debug!(path = %path.display(), "Wrote article JSON");

    Ok(path)
}
