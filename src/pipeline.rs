//! Three-stage scraping pipeline.
//!
//! ```text
//! discover_links ──URLs──▶ fetch_articles ──Articles──▶ persist_articles
//!   (1 task)     bounded     (1 dispatcher +   bounded     (runs inline)
//!                            N fetch units)
//! ```
//!
//! Each arrow is a bounded `mpsc` channel, so a full buffer stalls its
//! producer. A stage closes its output by dropping its sender when it
//! finishes. The fetch dispatcher first joins every unit it launched, so
//! the sink never sees a closed stream while fetches are still in flight.
//!
//! Every stage watches a [`CancellationToken`] at each await point. The
//! token is cancelled on Ctrl-C, or by the orchestrator when the sink hits
//! a fatal error.

use crate::error::{Result, ScrapeError};
use crate::market::MarketCalendar;
use crate::models::Article;
use crate::normalize::Normalizer;
use crate::outputs::json;
use crate::scrapers::{Extractor, Fetcher};
use crate::utils::{ensure_writable_dir, truncate_for_log};
use itertools::Itertools;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Inclusive, 1-indexed range of listing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start == 0 || start > end {
            return Err(ScrapeError::Config(format!(
                "page range {start}..={end} must satisfy 1 <= start <= end"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// A listing URL with `{page}` and optional `{category}` placeholders.
#[derive(Debug, Clone)]
pub struct ListingTemplate {
    url: String,
    categories: Vec<String>,
}

impl ListingTemplate {
    pub fn new(url: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            url: url.into(),
            categories,
        }
    }

    /// Every listing URL to visit, category-major. URLs are built lazily.
    pub fn page_urls(&self, range: PageRange) -> impl Iterator<Item = String> + '_ {
        let categories: Vec<Option<&str>> = if self.categories.is_empty() {
            vec![None]
        } else {
            self.categories.iter().map(|c| Some(c.as_str())).collect()
        };

        categories
            .into_iter()
            .cartesian_product(range.pages())
            .map(|(category, page)| {
                let url = self.url.replace("{page}", &page.to_string());
                match category {
                    Some(c) => url.replace("{category}", &urlencoding::encode(c)),
                    None => url,
                }
            })
    }
}

fn resolve(base: &str, href: &str) -> Result<String> {
    let joined = Url::parse(base)
        .and_then(|base| base.join(href))
        .map_err(|source| ScrapeError::Url {
            url: href.to_string(),
            source,
        })?;
    Ok(joined.into())
}

/// Visit every listing page and push the article links found onto `links`.
///
/// Listing pages that fail to load are logged and skipped. Returns the
/// number of links emitted. `links` is dropped on return, which closes the
/// URL stream.
#[instrument(level = "info", skip_all, fields(source = extractor.name()))]
pub async fn discover_links(
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    listing: ListingTemplate,
    range: PageRange,
    links: mpsc::Sender<String>,
    cancel: CancellationToken,
) -> usize {
    let mut emitted = 0;

    for page_url in listing.page_urls(range) {
        info!(%page_url, "Visiting listing page");
        let body = tokio::select! {
            _ = cancel.cancelled() => break,
            body = fetcher.fetch(&page_url) => body,
        };
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                error!(%page_url, error = %e, "Listing page fetch failed; skipping");
                continue;
            }
        };

        let hrefs = extractor.list_article_links(&body);
        let found = hrefs.len();
        for href in hrefs {
            let link = match resolve(&page_url, &href) {
                Ok(link) => link,
                Err(e) => {
                    warn!(%page_url, %href, error = %e, "Unresolvable article link");
                    continue;
                }
            };
            let sent = tokio::select! {
                _ = cancel.cancelled() => return emitted,
                sent = links.send(link) => sent,
            };
            if sent.is_err() {
                debug!("URL stream closed by consumer");
                return emitted;
            }
            emitted += 1;
        }
        info!(%page_url, found, "Listing page completed");
    }

    info!(emitted, "Link discovery finished");
    emitted
}

/// Counts reported by [`fetch_articles`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Units started, one per URL received.
    pub launched: usize,
    /// Articles handed to the sink.
    pub emitted: usize,
    /// Pages with no article body.
    pub empty: usize,
    /// Pages without a usable publication time.
    pub undated: usize,
    /// Fetch, calendar or task failures.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitOutcome {
    Emitted,
    Empty,
    Undated,
    Failed,
    /// Cancelled, or the sink went away before the article was handed over.
    Abandoned,
}

impl FetchSummary {
    fn record(&mut self, finished: std::result::Result<UnitOutcome, JoinError>) {
        match finished {
            Ok(UnitOutcome::Emitted) => self.emitted += 1,
            Ok(UnitOutcome::Empty) => self.empty += 1,
            Ok(UnitOutcome::Undated) => self.undated += 1,
            Ok(UnitOutcome::Failed) => self.failed += 1,
            Ok(UnitOutcome::Abandoned) => {}
            Err(e) => {
                error!(error = %e, "Fetch unit panicked");
                self.failed += 1;
            }
        }
    }
}

/// Consume URLs, fetching and extracting each in its own task.
///
/// At most `concurrency` units run at once (`None` or `Some(0)` = no limit). The
/// function returns, dropping `articles` and closing the article stream,
/// only after every launched unit has been joined.
#[instrument(level = "info", skip_all, fields(source = extractor.name(), concurrency = ?concurrency))]
pub async fn fetch_articles(
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    calendar: Arc<MarketCalendar>,
    mut links: mpsc::Receiver<String>,
    articles: mpsc::Sender<Article>,
    concurrency: Option<usize>,
    cancel: CancellationToken,
) -> FetchSummary {
    let limiter = concurrency
        .filter(|n| *n > 0)
        .map(|n| Arc::new(Semaphore::new(n)));
    let mut units = JoinSet::new();
    let mut summary = FetchSummary::default();

    loop {
        let url = tokio::select! {
            _ = cancel.cancelled() => break,
            next = links.recv() => match next {
                Some(url) => url,
                None => break,
            },
        };

        let permit = match &limiter {
            Some(limiter) => tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(limiter).acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                },
            },
            None => None,
        };

        while let Some(finished) = units.try_join_next() {
            summary.record(finished);
        }

        summary.launched += 1;
        let fetcher = Arc::clone(&fetcher);
        let extractor = Arc::clone(&extractor);
        let calendar = Arc::clone(&calendar);
        let articles = articles.clone();
        let cancel = cancel.clone();
        units.spawn(async move {
            let _permit = permit;
            fetch_unit(url, fetcher, extractor, calendar, articles, cancel).await
        });
    }

    drop(links);
    while let Some(finished) = units.join_next().await {
        summary.record(finished);
    }

    info!(
        launched = summary.launched,
        emitted = summary.emitted,
        empty = summary.empty,
        undated = summary.undated,
        failed = summary.failed,
        "Fetch stage finished"
    );
    summary
}

async fn fetch_unit(
    url: String,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    calendar: Arc<MarketCalendar>,
    articles: mpsc::Sender<Article>,
    cancel: CancellationToken,
) -> UnitOutcome {
    debug!(%url, "Scraping article");
    let body = tokio::select! {
        _ = cancel.cancelled() => return UnitOutcome::Abandoned,
        body = fetcher.fetch(&url) => body,
    };
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!(%url, error = %e, "Article fetch failed");
            return UnitOutcome::Failed;
        }
    };

    let Some(fields) = extractor.extract_article(&body) else {
        debug!(%url, "Article has no content; skipping");
        return UnitOutcome::Empty;
    };
    if fields.content.trim().is_empty() {
        debug!(%url, "Article has no content; skipping");
        return UnitOutcome::Empty;
    }
    let Some(timestamp) = fields.timestamp else {
        warn!(%url, title = %fields.title, "Article has no publication time; skipping");
        return UnitOutcome::Undated;
    };

    let article = match Article::new(
        url.as_str(),
        fields.title,
        fields.description,
        fields.content,
        timestamp,
        &calendar,
    ) {
        Ok(article) => article,
        Err(e) => {
            if e.is_fatal() {
                error!(%url, error = %e, "Failed to build article");
            } else {
                warn!(%url, error = %e, "Failed to build article");
            }
            return UnitOutcome::Failed;
        }
    };
    debug!(
        %url,
        market_timestamp = %article.market_timestamp(),
        off_market_hours = article.off_market_hours(),
        "Built article"
    );

    let sent = tokio::select! {
        _ = cancel.cancelled() => return UnitOutcome::Abandoned,
        sent = articles.send(article) => sent,
    };
    match sent {
        Ok(()) => UnitOutcome::Emitted,
        Err(_) => UnitOutcome::Abandoned,
    }
}

/// Normalize and write every article received, until the stream closes.
///
/// Any error is fatal: the sink stops and returns it. Dropping `articles`
/// on the way out makes pending sends upstream fail.
#[instrument(level = "info", skip_all, fields(folder = %folder.display()))]
pub async fn persist_articles(
    mut articles: mpsc::Receiver<Article>,
    normalizer: Arc<Normalizer>,
    folder: PathBuf,
    cancel: CancellationToken,
) -> Result<usize> {
    let mut written = 0;

    loop {
        let mut article = tokio::select! {
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
            next = articles.recv() => match next {
                Some(article) => article,
                None => break,
            },
        };

        article.normalize(&normalizer)?;
        let path = json::write_article(&article, &folder).await?;
        written += 1;
        debug!(
            path = %path.display(),
            preview = %truncate_for_log(article.cleaned_content().unwrap_or_default(), 80),
            "Persisted article"
        );
    }

    info!(written, "Persistence finished");
    Ok(written)
}

/// Per-run stage settings.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub link_buffer: usize,
    pub article_buffer: usize,
    /// Fetch ceiling; `None` = unbounded.
    pub concurrency: Option<usize>,
}

/// Outcome of one [`Pipeline::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub links: usize,
    pub fetch: FetchSummary,
    pub written: usize,
}

/// Wires the stages together for one source.
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    calendar: Arc<MarketCalendar>,
    normalizer: Arc<Normalizer>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        calendar: Arc<MarketCalendar>,
        normalizer: Arc<Normalizer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            calendar,
            normalizer,
            settings,
        }
    }

    /// Scrape `range` of `listing` into `folder`.
    ///
    /// # Errors
    ///
    /// Fatal errors only: the output folder is unusable, a write failed, a
    /// literal could not be tokenized, or `cancel` fired. Per-page and
    /// per-article failures are logged and counted in the summary instead.
    #[instrument(level = "info", skip_all, fields(source = self.extractor.name(), folder = %folder.display()))]
    pub async fn run(
        &self,
        listing: &ListingTemplate,
        range: PageRange,
        folder: &Path,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        ensure_writable_dir(folder).await?;

        let run_cancel = cancel.child_token();
        let (link_tx, link_rx) = mpsc::channel(self.settings.link_buffer);
        let (article_tx, article_rx) = mpsc::channel(self.settings.article_buffer);

        let discovery = tokio::spawn(discover_links(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.extractor),
            listing.clone(),
            range,
            link_tx,
            run_cancel.clone(),
        ));
        let fetching = tokio::spawn(fetch_articles(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.extractor),
            Arc::clone(&self.calendar),
            link_rx,
            article_tx,
            self.settings.concurrency,
            run_cancel.clone(),
        ));

        let persisted = persist_articles(
            article_rx,
            Arc::clone(&self.normalizer),
            folder.to_path_buf(),
            run_cancel.clone(),
        )
        .await;
        match &persisted {
            Err(ScrapeError::Cancelled) => run_cancel.cancel(),
            Err(e) => {
                error!(error = %e, "Persistence failed; stopping pipeline");
                run_cancel.cancel();
            }
            Ok(_) => {}
        }

        let links = discovery.await?;
        let fetch = fetching.await?;
        let written = persisted?;
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }

        info!(links, written, "Pipeline run complete");
        Ok(RunSummary {
            links,
            fetch,
            written,
        })
    }
}
