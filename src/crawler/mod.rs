//! Weekly article crawling
//!
//! Articles are fetched one week at a time, oldest first, with the fetcher's
//! rate limiter plus a fixed pause between articles. A failed week is logged
//! and skipped; it never aborts the run.

pub mod fetcher;
pub mod headers;
pub mod url;

pub use fetcher::BlogFetcher;
pub use url::WeekId;

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::ResolvedEntry;
use crate::parser::ArticleParser;
use crate::utils::error::FetchError;

/// Outcome counters for one crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// Articles downloaded
    pub fetched: usize,
    /// Articles that do not exist (yet)
    pub missing: usize,
    /// Articles whose download failed
    pub failed: usize,
    /// Downloaded articles that yielded no entries
    pub empty: usize,
    /// Entries extracted across all articles
    pub entries: usize,
}

/// Fetches weekly articles and runs the parser over each
pub struct WeeklyCrawler {
    fetcher: BlogFetcher,
    parser: ArticleParser,
    base_url: String,
    request_delay: Duration,
}

impl WeeklyCrawler {
    /// Create a crawler from validated configuration
    ///
    /// Bad settings and uncompilable extraction rules both come back as
    /// [`Error::Config`].
    pub fn new(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::config(format!("{e:#}")))?;

        let fetcher = BlogFetcher::new(&config.crawler)?;
        let parser = ArticleParser::new(&config.extraction)?;

        Ok(Self::with_parts(
            fetcher,
            parser,
            &config.crawler.base_url,
            config.request_delay(),
        ))
    }

    /// Assemble a crawler from prebuilt parts
    pub fn with_parts(
        fetcher: BlogFetcher,
        parser: ArticleParser,
        base_url: &str,
        request_delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            parser,
            base_url: base_url.to_string(),
            request_delay,
        }
    }

    /// Crawl every week from `start` to `end` inclusive
    pub async fn crawl(&self, start: WeekId, end: WeekId) -> (Vec<ResolvedEntry>, CrawlReport) {
        let urls = url::generate_weekly_urls(&self.base_url, start, end);
        info!(start = %start, end = %end, articles = urls.len(), "Starting weekly crawl");

        let mut entries = Vec::new();
        let mut report = CrawlReport::default();

        for (i, article_url) in urls.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            match self.crawl_article(article_url).await {
                Ok(found) => {
                    report.fetched += 1;
                    if found.is_empty() {
                        report.empty += 1;
                    }
                    report.entries += found.len();
                    entries.extend(found);
                }
                Err(FetchError::NotFound(_)) => {
                    debug!(url = %article_url, "Article not published");
                    report.missing += 1;
                }
                Err(e) => {
                    let err = Error::from(e);
                    warn!(
                        url = %article_url,
                        category = %err.category(),
                        recoverable = err.is_recoverable(),
                        error = %err,
                        "Failed to fetch article"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            fetched = report.fetched,
            missing = report.missing,
            failed = report.failed,
            empty = report.empty,
            entries = report.entries,
            "Weekly crawl finished"
        );

        (entries, report)
    }

    /// Fetch and parse a single article
    pub async fn crawl_article(
        &self,
        article_url: &str,
    ) -> std::result::Result<Vec<ResolvedEntry>, FetchError> {
        let html = self.fetcher.fetch(article_url).await?;
        Ok(self.parser.parse(&html, article_url))
    }
}
