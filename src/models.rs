//! Data models for scraped articles.
//!
//! - [`ExtractedArticle`]: the fields an extractor pulls out of a page
//! - [`Article`]: a scraped article tagged with its trading session, as
//!   written to disk
//!
//! An `Article` is built once by the fetch stage. The persistence stage
//! fills in `cleaned_content` exactly once. After that it is only
//! serialized.

use crate::error::Result;
use crate::market::MarketCalendar;
use crate::normalize::Normalizer;
use crate::utils::sanitize_title;
use chrono::{DateTime, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

/// Raw fields extracted from an article page.
///
/// `timestamp` is `None` when the page carried no parseable publication
/// time.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedArticle {
    pub title: String,
    pub description: String,
    pub content: String,
    pub timestamp: Option<DateTime<FixedOffset>>,
}

/// A scraped article, as persisted.
///
/// # JSON Schema
///
/// Empty strings and a missing `cleaned_content` are omitted. `timestamp`,
/// `market_timestamp` and `off_market_hours` are always present; timestamps
/// are RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// The URL the article was scraped from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Article body as extracted.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cleaned_content: Option<String>,
    /// Publication time as reported by the source.
    pub timestamp: DateTime<FixedOffset>,
    market_timestamp: DateTime<FixedOffset>,
    off_market_hours: bool,
}

impl Article {
    /// Build an article and attribute it to its trading session.
    ///
    /// # Errors
    ///
    /// [`crate::error::ScrapeError::Calendar`] if the calendar cannot find a
    /// session for `timestamp`.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
        calendar: &MarketCalendar,
    ) -> Result<Self> {
        let market_timestamp = calendar.next_session_start(&timestamp)?;
        debug_assert!(calendar.is_session(&market_timestamp));

        let published = timestamp.with_timezone(&calendar.offset());
        let off_market_hours = published.date_naive() != market_timestamp.date_naive()
            || published.hour() != market_timestamp.hour()
            || published.minute() != market_timestamp.minute();

        Ok(Self {
            url: url.into(),
            title: title.into(),
            description: description.into(),
            content: content.into(),
            cleaned_content: None,
            timestamp,
            market_timestamp,
            off_market_hours,
        })
    }

    pub fn market_timestamp(&self) -> DateTime<FixedOffset> {
        self.market_timestamp
    }

    pub fn off_market_hours(&self) -> bool {
        self.off_market_hours
    }

    pub fn cleaned_content(&self) -> Option<&str> {
        self.cleaned_content.as_deref()
    }

    /// Run `normalizer` over `content` and store the result.
    ///
    /// Normalizing again recomputes the same value, because cleaning is
    /// deterministic.
    pub fn normalize(&mut self, normalizer: &Normalizer) -> Result<()> {
        self.cleaned_content = Some(normalizer.clean(&self.content)?);
        Ok(())
    }

    /// `<unix timestamp>-<sanitized title>`, the on-disk name without
    /// extension.
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.timestamp.timestamp(), sanitize_title(&self.title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ist(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> DateTime<FixedOffset> {
        MarketCalendar::nse()
            .offset()
            .with_ymd_and_hms(y, m, d, hh, mm, 0)
            .unwrap()
    }

    fn article_at(ts: DateTime<FixedOffset>) -> Article {
        Article::new(
            "https://example.com/a",
            "Infosys Q2: profit up 5%",
            "",
            "Profit rose 12,500 crore",
            ts,
            &MarketCalendar::nse(),
        )
        .unwrap()
    }

    #[test]
    fn test_in_session_article() {
        let ts = ist(2024, 8, 21, 11, 5);
        let article = article_at(ts);
        assert_eq!(article.market_timestamp(), ts);
        assert!(!article.off_market_hours());
    }

    #[test]
    fn test_after_hours_article() {
        let ts = ist(2024, 8, 23, 17, 43);
        let article = article_at(ts);
        assert_eq!(article.market_timestamp(), ist(2024, 8, 26, 9, 15));
        assert!(article.off_market_hours());
        assert!(article.market_timestamp() >= article.timestamp);
    }

    #[test]
    fn test_off_market_hours_iff_outside_window() {
        let cal = MarketCalendar::nse();
        let mut ts = ist(2024, 8, 19, 0, 0);
        let end = ist(2024, 8, 27, 0, 0);
        while ts < end {
            let article = article_at(ts);
            assert_eq!(article.off_market_hours(), !cal.is_session(&ts), "{ts}");
            ts += chrono::Duration::minutes(23);
        }
    }

    #[test]
    fn test_off_market_compares_in_exchange_time() {
        // 05:00 UTC is 10:30 IST, inside the session
        let utc = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 8, 21, 5, 0, 0)
            .unwrap();
        let article = article_at(utc);
        assert!(!article.off_market_hours());
        assert_eq!(article.market_timestamp(), utc);
    }

    #[test]
    fn test_normalize_populates_cleaned_content() {
        let mut article = article_at(ist(2024, 8, 21, 11, 5));
        assert_eq!(article.cleaned_content(), None);
        article.normalize(&Normalizer::default()).unwrap();
        assert_eq!(
            article.cleaned_content(),
            Some("profit rose <ONE_TEN_THOUSAND> crore")
        );
    }

    #[test]
    fn test_file_stem() {
        let article = article_at(ist(2024, 8, 21, 11, 5));
        assert_eq!(
            article.file_stem(),
            format!("{}-Infosys-Q2-profit-up-5-", article.timestamp.timestamp())
        );
    }

    #[test]
    fn test_serialization_omits_empty_fields() {
        let article = article_at(ist(2024, 8, 23, 17, 43));
        let json: serde_json::Value = serde_json::to_value(&article).unwrap();
        assert!(json.get("description").is_none());
        assert!(json.get("cleaned_content").is_none());
        assert_eq!(json["timestamp"], "2024-08-23T17:43:00+05:30");
        assert_eq!(json["market_timestamp"], "2024-08-26T09:15:00+05:30");
        assert_eq!(json["off_market_hours"], true);
    }

    #[test]
    fn test_deserialize_written_record() {
        let mut article = article_at(ist(2024, 8, 21, 11, 5));
        article.normalize(&Normalizer::default()).unwrap();
        let json = serde_json::to_string(&article).unwrap();
        let back: Article = serde_json::from_str(&json).unwrap();
        assert_eq!(back, article);
    }
}
