//! kobo99 - Kobo weekly 99 e-book calendar builder
//!
//! Crawls the Kobo Taiwan blog's weekly "99元" articles, works out which
//! book is on sale on which day, and publishes the result as an iCalendar
//! feed.
//!
//! # Architecture
//!
//! - [`config`] - Configuration management and extraction rule tables
//! - [`crawler`] - Weekly article URLs, rate-limited fetching
//! - [`parser`] - Block location, date mining, reconciliation, date assignment
//! - [`models`] - Core data structures and types
//! - [`storage`] - JSON entry store, cross-run merge and collision scoring
//! - [`calendar`] - iCalendar rendering
//! - [`utils`] - Error types, retry helpers and text utilities
//!
//! # Example
//!
//! ```no_run
//! use kobo99::config::ExtractionRules;
//! use kobo99::parser::ArticleParser;
//!
//! fn main() -> anyhow::Result<()> {
//!     let parser = ArticleParser::new(&ExtractionRules::default())?;
//!     let html = std::fs::read_to_string("weekly-dd99-2025-w51.html")?;
//!     for entry in parser.parse(&html, "https://www.kobo.com/zh/blog/weekly-dd99-2025-w51") {
//!         println!("{} {}", entry.date, entry.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod parser;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::calendar::CalendarWriter;
    pub use crate::config::{Config, ExtractionRules};
    pub use crate::crawler::{CrawlReport, WeekId, WeeklyCrawler};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{ArticleBatch, DateSource, ResolvedEntry};
    pub use crate::parser::ArticleParser;
    pub use crate::storage::EntryStore;
}

// Direct re-exports for convenience
pub use models::{ArticleBatch, DateSource, ResolvedEntry};
