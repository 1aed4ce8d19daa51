//! News source extractors and the HTTP fetcher.
//!
//! Scraping a source takes two capabilities:
//!
//! - a [`Fetcher`] turns a URL into a document body
//! - an [`Extractor`] understands one site's markup. It pulls article links
//!   out of listing pages and article fields out of article pages.
//!
//! The pipeline only sees these two traits. Sources are picked by
//! [`SourceKind`] from the config.
//!
//! # Supported Sources
//!
//! | Source | Module | Listing | Timestamp |
//! |--------|--------|---------|-----------|
//! | LiveMint | [`livemint`] | `/listing/subsection/.../{page}` | `12 Aug 2024, 10:31 AM IST` |
//! | Economic Times | [`economic_times`] | `lazy_list_tech.cms?msid=..&curpg=..` | epoch millis in `data-dt` |
//! | Moneycontrol | [`moneycontrol`] | `/news/tags/companies/news/page-N/` | `August 23, 2024` + `17:43 IST` |

pub mod economic_times;
pub mod livemint;
pub mod moneycontrol;

use crate::config::{HttpConfig, SourceKind};
use crate::error::Result;
use crate::models::ExtractedArticle;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use scraper::{ElementRef, Selector};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Per-site markup knowledge.
///
/// Implementations are pure functions of the document. Parsing happens
/// synchronously inside a fetch unit, so nothing here crosses an `.await`.
pub trait Extractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Article links on a listing page. Links may be relative; the caller
    /// resolves them against the listing URL.
    fn list_article_links(&self, document: &str) -> Vec<String>;

    /// Article fields, or `None` when the page has no article body.
    fn extract_article(&self, document: &str) -> Option<ExtractedArticle>;
}

/// Retrieves documents by URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(bytes = body.len(), "Fetched document");
        Ok(body)
    }
}

/// Build the extractor for a source. `offset` is the zone that
/// timestamps without an explicit offset are read in.
pub fn extractor_for(kind: SourceKind, offset: FixedOffset) -> Arc<dyn Extractor> {
    match kind {
        SourceKind::LiveMint => Arc::new(livemint::LiveMint::new(offset)),
        SourceKind::EconomicTimes => Arc::new(economic_times::EconomicTimes::new(offset)),
        SourceKind::MoneyControl => Arc::new(moneycontrol::MoneyControl::new(offset)),
    }
}

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Whitespace-normalized text of the first element matching `selector`
/// under `root`, or an empty string.
pub(crate) fn first_text(root: ElementRef<'_>, selector: &Selector) -> String {
    root.select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    let raw = element.text().collect::<Vec<_>>().join(" ");
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a wall-clock time such as `12 Aug 2024, 10:31 AM IST`.
///
/// Sites print a zone abbreviation that chrono can't resolve, so a
/// trailing all-caps word other than `AM`/`PM` is dropped and the time is
/// read in `offset`.
/// Failures are logged and yield `None`.
pub(crate) fn parse_local_time(
    text: &str,
    format: &str,
    offset: FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    let without_zone = match text.rsplit_once(' ') {
        Some((head, zone))
            if !zone.is_empty()
                && zone.chars().all(|c| c.is_ascii_uppercase())
                && !matches!(zone, "AM" | "PM") =>
        {
            head
        }
        _ => text,
    };

    match NaiveDateTime::parse_from_str(without_zone, format) {
        Ok(naive) => offset.from_local_datetime(&naive).single(),
        Err(e) => {
            warn!(%text, format, error = %e, "Unparseable article timestamp");
            None
        }
    }
}
