//! # Market News
//!
//! Scrapes market news articles from Indian financial news sites, rewrites
//! every numeric mention as a magnitude token, tags each article with the
//! trading session it belongs to, and writes one JSON file per article.
//!
//! ## Usage
//!
//! ```sh
//! market_news --source money-control --start 1 --end 3 -o ./out
//! ```
//!
//! ## Architecture
//!
//! Each source runs its own three-stage pipeline:
//! 1. **Discovery**: walk the listing pages and emit article URLs
//! 2. **Fetching**: download and extract articles with a bounded worker pool,
//!    attributing each to the next trading session
//! 3. **Persistence**: normalize the body and write `<unix>-<title>.json`
//!
//! Sources run one after another. Ctrl-C cancels the run in progress.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod market;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use config::Config;
use normalize::{Normalizer, Tokenizer};
use pipeline::{ListingTemplate, Pipeline, PipelineSettings};
use scrapers::{Fetcher, HttpFetcher, extractor_for};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("market_news starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::builtin(),
    };
    config.apply_cli(&args)?;
    info!(sources = config.sources.len(), "Configuration ready");

    let calendar = Arc::new(config.market.calendar()?);
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.http)?);
    let normalizer = Arc::new(Normalizer::new(Tokenizer::default()));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling run");
            on_signal.cancel();
        }
    });

    let mut total_written = 0;
    for source in &config.sources {
        let extractor = extractor_for(source.kind, calendar.offset());
        let settings = PipelineSettings {
            link_buffer: config.pipeline.link_buffer,
            article_buffer: config.pipeline.article_buffer,
            concurrency: source.concurrency_limit(&config.pipeline),
        };
        let pipeline = Pipeline::new(
            Arc::clone(&fetcher),
            extractor,
            Arc::clone(&calendar),
            Arc::clone(&normalizer),
            settings,
        );
        let listing = ListingTemplate::new(&source.listing_url, source.categories.clone());

        info!(
            source = %source.name,
            start = source.start,
            end = source.end,
            folder = %source.folder.display(),
            concurrency = ?settings.concurrency,
            "Scraping source"
        );
        match pipeline
            .run(&listing, source.page_range()?, &source.folder, &cancel)
            .await
        {
            Ok(summary) => {
                info!(
                    source = %source.name,
                    links = summary.links,
                    fetched = summary.fetch.launched,
                    empty = summary.fetch.empty,
                    undated = summary.fetch.undated,
                    failed = summary.fetch.failed,
                    written = summary.written,
                    "Source complete"
                );
                total_written += summary.written;
            }
            Err(e) => {
                error!(source = %source.name, error = %e, "Source run failed");
                return Err(e.into());
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        written = total_written,
        elapsed_secs = elapsed.as_secs_f64(),
        "market_news finished"
    );
    Ok(())
}
