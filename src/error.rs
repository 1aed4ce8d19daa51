//! Error taxonomy for the acquisition pipeline.
//!
//! Variants fall into two groups. Transient failures (`Http`, `Url`,
//! `Calendar`) only ever cost the single page or article they occurred on;
//! the stage logs them and moves on. Everything else is fatal for the run
//! and is propagated up to `main`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("numeric literal {literal:?} cannot be tokenized: {reason}")]
    Tokenize { literal: String, reason: String },

    #[error("no trading session found within {limit} adjustments of {from}")]
    Calendar { from: String, limit: usize },

    #[error("failed to write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize article: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("run cancelled")]
    Cancelled,
}

impl ScrapeError {
    /// Whether this error must abort the whole run rather than the one
    /// page or article it happened on.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ScrapeError::Http(_) | ScrapeError::Url { .. } | ScrapeError::Calendar { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
