//! Moneycontrol company-news scraper.
//!
//! Story pages wrap everything in `div.page_left_wrapper`. The schedule
//! line reads `<span>August 23, 2024</span>/ 17:43 IST`: the date and the
//! time live on either side of a slash. Body paragraphs inside
//! `div#contentdata` that carry a `class` attribute are ads or embeds and
//! are skipped.

use super::{Extractor, element_text, first_text, parse_local_time, selector};
use crate::models::ExtractedArticle;
use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

// The site really does spell the listing id "cagetory".
static LINKS: Lazy<Selector> = Lazy::new(|| selector("ul#cagetory li.clearfix h2 a[href]"));
static WRAPPER: Lazy<Selector> = Lazy::new(|| selector("div.page_left_wrapper"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("h1"));
static SUMMARY: Lazy<Selector> = Lazy::new(|| selector("h2"));
static SCHEDULE: Lazy<Selector> = Lazy::new(|| selector("div.article_schedule"));
static SCHEDULE_DATE: Lazy<Selector> = Lazy::new(|| selector("span"));
static CONTENT: Lazy<Selector> = Lazy::new(|| selector("div#contentdata"));
static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| selector("p"));

const DATE_FORMAT: &str = "%B %d, %Y %H:%M";

#[derive(Debug, Clone)]
pub struct MoneyControl {
    offset: FixedOffset,
}

impl MoneyControl {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    fn timestamp(&self, wrapper: ElementRef<'_>) -> Option<DateTime<FixedOffset>> {
        let schedule = wrapper.select(&SCHEDULE).next()?;
        let date = first_text(schedule, &SCHEDULE_DATE);
        let full = element_text(schedule);
        let time = full.split('/').nth(1).map(str::trim).unwrap_or_default();
        parse_local_time(&format!("{date} {time}"), DATE_FORMAT, self.offset)
    }
}

impl Extractor for MoneyControl {
    fn name(&self) -> &str {
        "money-control"
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
        let wrapper = html.select(&WRAPPER).next()?;

        let Some(body) = wrapper.select(&CONTENT).next() else {
            debug!("Moneycontrol page has no #contentdata");
            return None;
        };
        let content = body
            .select(&PARAGRAPHS)
            .filter(|p| p.value().attr("class").is_none_or(str::is_empty))
            .map(element_text)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if content.is_empty() {
            return None;
        }

        Some(ExtractedArticle {
            title: first_text(wrapper, &TITLE),
            description: first_text(wrapper, &SUMMARY),
            content,
            timestamp: self.timestamp(wrapper),
        })
    }
}
