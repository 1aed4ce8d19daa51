//! Command-line interface definitions.
//!
//! Every option can also come from the environment. Anything not given
//! falls back to the YAML config, and then to the built-in source list.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for a scraping run.
///
/// # Examples
///
/// ```sh
/// # Scrape every built-in source with its configured page range
/// market_news
///
/// # Only Moneycontrol, pages 1-3, into ./out/money-control
/// market_news --source money-control --start 1 --end 3 -o ./out
///
/// # Custom source list and calendar
/// market_news -c sources.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "MARKET_NEWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only run the named sources (repeatable)
    #[arg(short, long = "source")]
    pub sources: Vec<String>,

    /// First listing page to visit (1-indexed), for every selected source
    #[arg(long)]
    pub start: Option<u32>,

    /// Last listing page to visit (inclusive), for every selected source
    #[arg(long)]
    pub end: Option<u32>,

    /// Base output directory; each source writes to `<dir>/<source name>`
    #[arg(short, long, env = "MARKET_NEWS_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum concurrent article fetches per source (0 = unbounded)
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["market_news"]);
        assert!(cli.sources.is_empty());
        assert_eq!(cli.start, None);
        assert_eq!(cli.concurrency, None);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "market_news",
            "--config",
            "./sources.yaml",
            "--source",
            "live-mint",
            "--source",
            "money-control",
            "--start",
            "2",
            "--end",
            "4",
            "--concurrency",
            "8",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("./sources.yaml")));
        assert_eq!(cli.sources, vec!["live-mint", "money-control"]);
        assert_eq!(cli.start, Some(2));
        assert_eq!(cli.end, Some(4));
        assert_eq!(cli.concurrency, Some(8));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "market_news",
            "-c",
            "/tmp/c.yaml",
            "-s",
            "economic-times",
            "-o",
            "/tmp/out",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
        assert_eq!(cli.sources, vec!["economic-times"]);
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/out")));
    }
}
