//! LiveMint article scraper.
//!
//! Listing pages link each story from an `h2.headline` with a site-relative
//! href. Story pages carry the headline in `h1#article-0` and the summary
//! in a hashed-class `h2`. The publication time looks like
//! `12 Aug 2024, 10:31 AM IST`.

use super::{Extractor, element_text, first_text, parse_local_time, selector};
use crate::models::ExtractedArticle;
use chrono::FixedOffset;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

static LINKS: Lazy<Selector> = Lazy::new(|| selector("h2.headline a[href]"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("h1#article-0"));
static SUMMARY: Lazy<Selector> = Lazy::new(|| selector("h2.storyPage_summary__Ge5SX"));
static DATE: Lazy<Selector> = Lazy::new(|| selector("div.storyPage_date__JS9qJ span"));
static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| selector("div.storyParagraph p"));

const DATE_FORMAT: &str = "%d %b %Y, %I:%M %p";

#[derive(Debug, Clone)]
pub struct LiveMint {
    offset: FixedOffset,
}

impl LiveMint {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Extractor for LiveMint {
    fn name(&self) -> &str {
        "live-mint"
    }

    fn list_article_links(&self, document: &str) -> Vec<String> {
        let html = Html::parse_document(document);
        html.select(&LINKS)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string)
            .collect()
    }

    fn extract_article(&self, document: &str) -> Option<ExtractedArticle> {
        let html = Html::parse_document(document);
        let root = html.root_element();

        let content = html
            .select(&PARAGRAPHS)
            .map(element_text)
            .filter(|p| !p.is_empty() && !p.starts_with("Disclaimer"))
            .collect::<Vec<_>>()
            .join(" ");
        if content.is_empty() {
            debug!("LiveMint page has no story paragraphs");
            return None;
        }

        let timestamp = html
            .select(&DATE)
            .next()
            .and_then(|span| parse_local_time(&element_text(span), DATE_FORMAT, self.offset));

        Some(ExtractedArticle {
            title: first_text(root, &TITLE),
            description: first_text(root, &SUMMARY),
            content,
            timestamp,
        })
    }
}
