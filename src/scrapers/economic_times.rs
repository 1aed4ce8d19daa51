//! Economic Times scraper.
//!
//! Listings come from the `lazy_list_tech.cms` endpoint, one `msid` per
//! industry category. Story pages stamp the publication time as epoch
//! milliseconds in `time.jsdtTime[data-dt]`. The body in `div.artText` is
//! loose text interleaved with inline markup. Everything after the first
//! non-empty nested `div` (related stories, widgets) is dropped.

use super::{Extractor, first_text, selector};
use crate::models::ExtractedArticle;
use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, warn};

static LINKS: Lazy<Selector> = Lazy::new(|| selector(".story-box .desc h4 a[href]"));
static TIME: Lazy<Selector> = Lazy::new(|| selector("time.jsdtTime"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("h1.artTitle"));
static SUMMARY: Lazy<Selector> = Lazy::new(|| selector("h2.summary"));
static BODY: Lazy<Selector> = Lazy::new(|| selector("div.artText"));

#[derive(Debug, Clone)]
pub struct EconomicTimes {
    offset: FixedOffset,
}

impl EconomicTimes {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    fn timestamp(&self, html: &Html) -> Option<DateTime<FixedOffset>> {
        let raw = html.select(&TIME).next()?.value().attr("data-dt")?.trim();
        match raw.parse::<i64>() {
            Ok(millis) => {
                DateTime::from_timestamp(millis / 1000, 0).map(|ts| ts.with_timezone(&self.offset))
            }
            Err(e) => {
                warn!(data_dt = raw, error = %e, "Unparseable article timestamp");
                None
            }
        }
    }
}

/// Loose text of the article body, stopping at the first nested `div` that
/// has any text in it.
fn body_text(body: ElementRef<'_>) -> String {
    let mut text = String::new();
    for child in body.children() {
        match child.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(el) => {
                let Some(element) = ElementRef::wrap(child) else {
                    continue;
                };
                match el.name() {
                    "style" | "script" => {}
                    "br" => text.push(' '),
                    "div" => {
                        if element.text().any(|t| !t.trim().is_empty()) {
                            break;
                        }
                    }
                    _ => {
                        text.push(' ');
                        text.extend(element.text());
                        text.push(' ');
                    }
                }
            }
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Extractor for EconomicTimes {
    fn name(&self) -> &str {
        "economic-times"
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

        let content = html.select(&BODY).next().map(body_text).unwrap_or_default();
        if content.is_empty() {
            debug!("Economic Times page has no article text");
            return None;
        }

        Some(ExtractedArticle {
            title: first_text(root, &TITLE),
            description: first_text(root, &SUMMARY),
            content,
            timestamp: self.timestamp(&html),
        })
    }
}
