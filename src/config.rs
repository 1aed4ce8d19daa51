//! Run configuration.
//!
//! The YAML file has four sections:
//!
//! ```yaml
//! market:
//!   utc_offset_minutes: 330
//!   session_open: "09:15:00"
//!   session_close: "15:30:00"
//!   holidays:
//!     - { month: 1, day: 26, name: republic day }
//! http:
//!   user_agent: "Mozilla/5.0 (compatible; market_news/0.1)"
//!   timeout_secs: 30
//! pipeline:
//!   link_buffer: 50
//!   article_buffer: 50
//!   concurrency: 16        # 0 = unbounded
//! sources:
//!   - name: money-control
//!     kind: money_control
//!     listing_url: "https://www.moneycontrol.com/news/tags/companies/news/page-{page}/"
//!     start: 1
//!     end: 30
//!     folder: data/news/money-control-articles-formatted
//!     concurrency: 5
//! ```
//!
//! Every section is optional. Missing sections take the built-in defaults,
//! which reproduce the three sources the scraper was written for.

use crate::cli::Cli;
use crate::error::{Result, ScrapeError};
use crate::market::{Holiday, MarketCalendar};
use crate::pipeline::PageRange;
use chrono::{FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub market: MarketConfig,
    pub http: HttpConfig,
    pub pipeline: PipelineConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Exchange offset from UTC, in minutes east.
    pub utc_offset_minutes: i32,
    pub session_open: NaiveTime,
    pub session_close: NaiveTime,
    pub holidays: Vec<Holiday>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of the URL stream between discovery and fetching.
    pub link_buffer: usize,
    /// Capacity of the article stream between fetching and persistence.
    pub article_buffer: usize,
    /// Default fetch concurrency for sources that don't set one. 0 = unbounded.
    pub concurrency: usize,
}

/// Which extractor understands a source's markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    LiveMint,
    EconomicTimes,
    MoneyControl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    /// Listing URL with a `{page}` placeholder, plus `{category}` when
    /// `categories` is non-empty.
    pub listing_url: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub start: u32,
    pub end: u32,
    pub folder: PathBuf,
    /// Overrides `pipeline.concurrency`. 0 = unbounded.
    #[serde(default)]
    pub concurrency: Option<usize>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        let nse = MarketCalendar::nse();
        Self {
            utc_offset_minutes: nse.offset().local_minus_utc() / 60,
            session_open: nse.session_open(),
            session_close: nse.session_close(),
            holidays: nse.holidays().to_vec(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "Mozilla/5.0 (compatible; market_news/{})",
                env!("CARGO_PKG_VERSION")
            ),
            timeout_secs: 30,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            link_buffer: 50,
            article_buffer: 50,
            concurrency: 16,
        }
    }
}

impl MarketConfig {
    /// Build the calendar this section describes.
    pub fn calendar(&self) -> Result<MarketCalendar> {
        let offset = self
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ScrapeError::Config(format!(
                    "utc offset {} minutes is out of range",
                    self.utc_offset_minutes
                ))
            })?;
        MarketCalendar::new(
            offset,
            self.session_open,
            self.session_close,
            self.holidays.clone(),
        )
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SourceConfig {
    pub fn page_range(&self) -> Result<PageRange> {
        PageRange::new(self.start, self.end)
    }

    /// Effective fetch ceiling; `None` means unbounded.
    pub fn concurrency_limit(&self, pipeline: &PipelineConfig) -> Option<usize> {
        let limit = self.concurrency.unwrap_or(pipeline.concurrency);
        (limit > 0).then_some(limit)
    }

    fn validate(&self) -> Result<()> {
        self.page_range()?;
        if !self.listing_url.contains("{page}") {
            return Err(ScrapeError::Config(format!(
                "source {}: listing_url must contain {{page}}",
                self.name
            )));
        }
        let wants_category = self.listing_url.contains("{category}");
        if wants_category != !self.categories.is_empty() {
            return Err(ScrapeError::Config(format!(
                "source {}: listing_url must contain {{category}} exactly when categories are set",
                self.name
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load and validate a YAML config. Sources default to the built-in
    /// list when the file has none.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&raw)?;
        if config.sources.is_empty() {
            debug!("Config has no sources; using built-in sources");
            config.sources = default_sources();
        }
        config.validate()?;
        info!(path = %path.display(), sources = config.sources.len(), "Loaded configuration");
        Ok(config)
    }

    /// Built-in configuration.
    pub fn builtin() -> Self {
        Self {
            sources: default_sources(),
            ..Self::default()
        }
    }

    /// Apply command-line overrides, then re-validate.
    pub fn apply_cli(&mut self, cli: &Cli) -> Result<()> {
        if !cli.sources.is_empty() {
            if let Some(unknown) = cli
                .sources
                .iter()
                .find(|name| !self.sources.iter().any(|s| &s.name == *name))
            {
                return Err(ScrapeError::Config(format!("unknown source {unknown}")));
            }
            self.sources.retain(|s| cli.sources.contains(&s.name));
        }

        for source in &mut self.sources {
            if let Some(start) = cli.start {
                source.start = start;
            }
            if let Some(end) = cli.end {
                source.end = end;
            }
            if let Some(limit) = cli.concurrency {
                source.concurrency = Some(limit);
            }
            if let Some(dir) = &cli.output_dir {
                source.folder = dir.join(&source.name);
            }
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.link_buffer == 0 || self.pipeline.article_buffer == 0 {
            return Err(ScrapeError::Config("channel buffers must be at least 1".to_string()));
        }
        self.market.calendar()?;
        for source in &self.sources {
            source.validate()?;
        }
        if let Some(dup) = self
            .sources
            .iter()
            .enumerate()
            .find(|(i, s)| self.sources[..*i].iter().any(|o| o.name == s.name))
            .map(|(_, s)| &s.name)
        {
            return Err(ScrapeError::Config(format!("duplicate source name {dup}")));
        }
        Ok(())
    }
}

/// Built-in sources: LiveMint, Economic Times and Moneycontrol.
pub fn default_sources() -> Vec<SourceConfig> {
    let data = PathBuf::from("data/news");
    vec![
        SourceConfig {
            name: "live-mint".to_string(),
            kind: SourceKind::LiveMint,
            listing_url: "https://www.livemint.com/listing/subsection/market~stock-market-news/{page}"
                .to_string(),
            categories: Vec::new(),
            start: 1,
            end: 50,
            folder: data.join("live-mint-articles-formatted"),
            concurrency: Some(0),
        },
        SourceConfig {
            name: "economic-times".to_string(),
            kind: SourceKind::EconomicTimes,
            listing_url:
                "https://economictimes.indiatimes.com/lazy_list_tech.cms?msid={category}&curpg={page}"
                    .to_string(),
            // information-tech, technology, banking, power, auto,
            // electric-vehicles, two/three-wheelers, finance, hotels
            categories: [
                "78570530", "78570561", "13358319", "13358361", "64829342", "81585238",
                "64829323", "13358311", "13357036",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            start: 1,
            end: 30,
            folder: data.join("economic-times-articles-formatted"),
            concurrency: Some(0),
        },
        SourceConfig {
            name: "money-control".to_string(),
            kind: SourceKind::MoneyControl,
            listing_url: "https://www.moneycontrol.com/news/tags/companies/news/page-{page}/"
                .to_string(),
            categories: Vec::new(),
            start: 1,
            end: 30,
            folder: data.join("money-control-articles-formatted"),
            concurrency: Some(5),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_builtin_config_is_valid() {
        let config = Config::builtin();
        config.validate().unwrap();
        assert_eq!(config.sources.len(), 3);
        let calendar = config.market.calendar().unwrap();
        assert_eq!(calendar.offset().local_minus_utc(), 330 * 60);
    }

    #[test]
    fn test_out_of_range_offset_is_config_error() {
        let config: Config =
            serde_yaml::from_str("market: { utc_offset_minutes: 40000000 }").unwrap();
        assert!(matches!(
            config.market.calendar(),
            Err(ScrapeError::Config(_))
        ));

        let market = MarketConfig {
            utc_offset_minutes: 24 * 60,
            ..MarketConfig::default()
        };
        assert!(matches!(market.calendar(), Err(ScrapeError::Config(_))));
    }

    #[test]
    fn test_concurrency_limit() {
        let pipeline = PipelineConfig::default();
        let mut source = default_sources().remove(2);
        assert_eq!(source.concurrency_limit(&pipeline), Some(5));
        source.concurrency = Some(0);
        assert_eq!(source.concurrency_limit(&pipeline), None);
        source.concurrency = None;
        assert_eq!(source.concurrency_limit(&pipeline), Some(16));
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
market:
  utc_offset_minutes: -300
  session_open: "09:30:00"
  session_close: "16:00:00"
  holidays:
    - {{ month: 7, day: 4, name: independence day }}
pipeline:
  concurrency: 4
sources:
  - name: wire
    kind: money_control
    listing_url: "https://news.example.com/{{category}}/page-{{page}}"
    categories: [markets, "earnings & results"]
    start: 2
    end: 5
    folder: out/wire
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.market.utc_offset_minutes, -300);
        assert_eq!(config.market.holidays.len(), 1);
        assert_eq!(config.pipeline.concurrency, 4);
        assert_eq!(config.pipeline.link_buffer, 50);
        assert_eq!(config.http.timeout_secs, 30);
        let source = &config.sources[0];
        assert_eq!(source.kind, SourceKind::MoneyControl);
        assert_eq!(source.categories.len(), 2);
        assert_eq!(source.concurrency_limit(&config.pipeline), Some(4));
    }

    #[test]
    fn test_empty_yaml_uses_builtin_sources() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http:\n  timeout_secs: 5").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.http.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_bad_page_range() {
        let mut config = Config::builtin();
        config.sources[0].start = 0;
        assert!(matches!(config.validate(), Err(ScrapeError::Config(_))));

        let mut config = Config::builtin();
        config.sources[0].start = 9;
        config.sources[0].end = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_category_mismatch() {
        let mut config = Config::builtin();
        config.sources[1].categories.clear();
        assert!(config.validate().is_err());

        let mut config = Config::builtin();
        config.sources[2].categories.push("x".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_cli_overrides() {
        let mut config = Config::builtin();
        let cli = Cli::parse_from([
            "market_news",
            "-s",
            "money-control",
            "--start",
            "2",
            "--end",
            "3",
            "--concurrency",
            "0",
            "-o",
            "/tmp/out",
        ]);
        config.apply_cli(&cli).unwrap();

        assert_eq!(config.sources.len(), 1);
        let source = &config.sources[0];
        assert_eq!((source.start, source.end), (2, 3));
        assert_eq!(source.concurrency_limit(&config.pipeline), None);
        assert_eq!(source.folder, PathBuf::from("/tmp/out/money-control"));
    }

    #[test]
    fn test_apply_cli_unknown_source() {
        let mut config = Config::builtin();
        let cli = Cli::parse_from(["market_news", "-s", "bloomberg"]);
        assert!(config.apply_cli(&cli).is_err());
    }
}
