// Core data structures for the kobo99 extractor

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::utils::error::ParseError;

/// The weekly article being parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub url: String,
    /// Year declared by the slug
    pub year: i32,
    /// ISO week declared by the slug
    pub week: u32,
}

impl ArticleRef {
    /// Decode year and week from the article URL slug.
    ///
    /// `slug` must capture the year in group 1 and the week in group 2.
    pub fn parse(url: &str, slug: &Regex) -> Result<Self, ParseError> {
        let caps = slug
            .captures(url)
            .ok_or_else(|| ParseError::InvalidArticleUrl(url.to_string()))?;

        let year = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .ok_or_else(|| ParseError::InvalidArticleUrl(url.to_string()))?;
        let week = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|w| (1..=53).contains(w))
            .ok_or_else(|| ParseError::InvalidArticleUrl(url.to_string()))?;

        Ok(Self {
            url: url.to_string(),
            year,
            week,
        })
    }
}

/// One HTML content node believed to describe one book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    /// Path segment after the product-link marker
    pub product_id: String,
    /// `href` as written in the page
    pub href: String,
    pub product_url: String,
    /// Cleaned title, empty when nothing usable was found
    pub title: String,
    pub excerpt: String,
    /// Visible text of the grouping element
    pub text: String,
    /// Document order among blocks
    pub position: usize,
}

impl RawBlock {
    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }
}

/// A (date, title) pair found in the article text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedDateTitle {
    /// Normalized title, the identity of the pair
    pub key: String,
    pub display_title: String,
    pub month: u32,
    pub day: u32,
    /// Date after cross-year correction
    pub date: NaiveDate,
}

/// Miner output: pairs in first-appearance order plus a lookup by key
#[derive(Debug, Clone, Default)]
pub struct MinedTable {
    entries: Vec<MinedDateTitle>,
    by_key: HashMap<String, NaiveDate>,
}

impl MinedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pair; the first mention of a key wins
    pub fn insert(&mut self, mined: MinedDateTitle) -> bool {
        if self.by_key.contains_key(&mined.key) {
            return false;
        }
        self.by_key.insert(mined.key.clone(), mined.date);
        self.entries.push(mined);
        true
    }

    pub fn get(&self, key: &str) -> Option<NaiveDate> {
        self.by_key.get(key).copied()
    }

    pub fn entries(&self) -> &[MinedDateTitle] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How an entry's date was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateSource {
    /// Read from explicit date text
    Mined,
    /// Taken from the irregular-week override table
    Override,
    /// Counted from the seed date by position
    #[default]
    Fallback,
}

impl std::fmt::Display for DateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Mined => "mined",
            Self::Override => "override",
            Self::Fallback => "fallback",
        })
    }
}

/// One book on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEntry {
    pub title: String,

    /// Canonical product URL; identifies the book across runs
    #[serde(alias = "book_url")]
    pub product_url: String,

    pub article_url: String,

    #[serde(default)]
    pub article_title: String,

    #[serde(default, alias = "content")]
    pub excerpt: String,

    pub date: NaiveDate,

    #[serde(default)]
    pub week: u32,

    #[serde(default)]
    pub year: i32,

    #[serde(default)]
    pub source: DateSource,
}

/// Canonical product URLs already bound to an entry during one parse
#[derive(Debug, Clone, Default)]
pub struct ConsumedBlocks {
    urls: HashSet<String>,
}

impl ConsumedBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a block as used; false when it already was
    pub fn consume(&mut self, product_url: &str) -> bool {
        self.urls.insert(product_url.to_string())
    }

    /// Return a block to the pool
    pub fn release(&mut self, product_url: &str) {
        self.urls.remove(product_url);
    }

    pub fn is_consumed(&self, product_url: &str) -> bool {
        self.urls.contains(product_url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Counters for one parsed article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub links: usize,
    pub blocks: usize,
    pub mined: usize,
    pub matched_text: usize,
    pub matched_position: usize,
    pub fallback: usize,
    /// Pairs skipped because their date was taken
    pub dropped: usize,
}

/// Everything extracted from one article
#[derive(Debug, Clone)]
pub struct ArticleBatch {
    pub article: ArticleRef,
    pub article_title: String,
    pub seed_date: NaiveDate,
    pub entries: Vec<ResolvedEntry>,
    pub stats: BatchStats,
}
