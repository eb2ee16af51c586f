//! Weekly article parsing
//!
//! [`ArticleParser`] runs the whole extraction for one article page:
//!
//! 1. decode year/week from the URL and infer the seed date
//! 2. locate product blocks and resolve their titles ([`blocks`])
//! 3. mine announced (date, title) pairs from the article text ([`miner`])
//! 4. bind pairs to blocks ([`reconcile`])
//! 5. assign dates, mined first and positional after ([`dates`])

pub mod blocks;
pub mod dates;
pub mod miner;
pub mod reconcile;
pub mod sanitize;
pub mod selectors;

pub use blocks::{BlockLocator, LocatedBlocks};
pub use dates::SeedSource;
pub use miner::DateMiner;
pub use reconcile::{MatchKind, Reconciled};

use regex::Regex;
use scraper::Html;
use tracing::{info, warn};

use crate::config::ExtractionRules;
use crate::models::{ArticleBatch, ArticleRef, BatchStats, ConsumedBlocks, ResolvedEntry};
use crate::parser::dates::{assign_dates, infer_seed_date, AssignContext};
use crate::parser::selectors::PageSelectors;
use crate::utils::error::ParseError;
use crate::utils::normalize_whitespace;

/// Elements whose text never belongs to the article body
const SKIPPED_TEXT_PARENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Parser for weekly 99 articles
pub struct ArticleParser {
    rules: ExtractionRules,
    slug: Regex,
    locator: BlockLocator,
    miner: DateMiner,
    page: PageSelectors,
}

impl ArticleParser {
    /// Build a parser, compiling every configured pattern up front.
    ///
    /// # Errors
    /// Returns [`Error::Config`](crate::error::Error::Config) when a configured regex or label does not
    /// compile.
    pub fn new(rules: &ExtractionRules) -> crate::error::Result<Self> {
        let slug = Regex::new(&rules.article_slug_pattern).map_err(|e| ParseError::InvalidPattern {
            pattern: rules.article_slug_pattern.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            rules: rules.clone(),
            slug,
            locator: BlockLocator::new(rules)?,
            miner: DateMiner::new(rules)?,
            page: PageSelectors::new(),
        })
    }

    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }

    /// Parse one article page into dated entries plus diagnostics.
    ///
    /// # Errors
    /// - `ParseError::InvalidArticleUrl` when the URL has no year/week slug
    /// - `ParseError::NoDateAnchor` when no seed date can be derived
    /// - `ParseError::NoProductLinks` when the page has no product links
    pub fn try_parse(&self, html: &str, url: &str) -> Result<ArticleBatch, ParseError> {
        let article = ArticleRef::parse(url, &self.slug)?;
        let document = Html::parse_document(html);

        let (seed_date, seed_source) = infer_seed_date(&document, &article, &self.rules, &self.page)
            .ok_or_else(|| ParseError::NoDateAnchor(url.to_string()))?;
        let article_title = self.article_title(&document);

        let located = self.locator.locate(&document);
        if located.links == 0 {
            return Err(ParseError::NoProductLinks(url.to_string()));
        }

        let text = article_text(&document);
        let mined = self.miner.mine(&text, &article);

        let mut consumed = ConsumedBlocks::new();
        let reconciled = reconcile::reconcile(
            &located.blocks,
            &mined,
            &self.rules.canonical_strip_chars,
            &mut consumed,
        );

        let mut stats = BatchStats {
            links: located.links,
            blocks: located.blocks.len(),
            mined: mined.len(),
            matched_text: count_kind(&reconciled, MatchKind::Text),
            matched_position: count_kind(&reconciled, MatchKind::Position),
            ..BatchStats::default()
        };

        let ctx = AssignContext {
            article: &article,
            article_title: &article_title,
            seed: seed_date,
            override_start: self.rules.override_for(url),
            days_per_week: self.rules.days_per_week,
        };
        let mut entries = assign_dates(
            &ctx,
            &reconciled,
            &mined,
            &located.blocks,
            &mut consumed,
            &mut stats,
        );
        entries.sort_by_key(|e| e.date);

        info!(
            url = %url,
            seed = %seed_date,
            seed_source = ?seed_source,
            links = stats.links,
            blocks = stats.blocks,
            mined = stats.mined,
            text_matches = stats.matched_text,
            positional = stats.matched_position,
            fallback = stats.fallback,
            entries = entries.len(),
            "Parsed weekly article"
        );

        Ok(ArticleBatch {
            article,
            article_title,
            seed_date,
            entries,
            stats,
        })
    }

    /// Parse one article page; failures are logged and yield no entries
    pub fn parse(&self, html: &str, url: &str) -> Vec<ResolvedEntry> {
        match self.try_parse(html, url) {
            Ok(batch) => batch.entries,
            Err(e) => {
                warn!(url = %url, error = %e, "Article yielded no entries");
                Vec::new()
            }
        }
    }

    fn article_title(&self, document: &Html) -> String {
        self.page
            .article_title
            .iter()
            .filter_map(|selector| document.select(selector).next())
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .find(|title| !title.is_empty())
            .unwrap_or_default()
    }
}

fn count_kind(reconciled: &[Reconciled], kind: MatchKind) -> usize {
    reconciled.iter().filter(|r| r.kind == kind).count()
}

/// Visible text nodes of the document, trimmed and joined with newlines
pub fn article_text(document: &Html) -> String {
    document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|parent| {
                parent
                    .value()
                    .as_element()
                    .is_some_and(|el| SKIPPED_TEXT_PARENTS.contains(&el.name()))
            });
            let trimmed = text.trim();
            (!hidden && !trimmed.is_empty()).then_some(trimmed)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
