//! Date assignment, rollover correction and publication-date inference

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use scraper::Html;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::config::ExtractionRules;
use crate::crawler::url::iso_week_monday;
use crate::models::{
    ArticleRef, BatchStats, ConsumedBlocks, DateSource, MinedTable, RawBlock, ResolvedEntry,
};
use crate::parser::reconcile::Reconciled;
use crate::parser::selectors::PageSelectors;

static TEXT_DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})\s*[年\-/.]\s*(\d{1,2})\s*[月\-/.]\s*(\d{1,2})\s*日?").unwrap());

/// Year a mined month belongs to, given the week the article declares.
///
/// A late-December week listing January days belongs to the next year, an
/// early-January week listing November/December days to the previous one.
///
/// ```
/// use kobo99::parser::dates::resolve_year;
///
/// assert_eq!(resolve_year(2025, 52, 1), 2026);
/// assert_eq!(resolve_year(2026, 1, 12), 2025);
/// assert_eq!(resolve_year(2025, 30, 7), 2025);
/// ```
pub fn resolve_year(declared_year: i32, week: u32, month: u32) -> i32 {
    if week >= 48 && month <= 2 {
        declared_year + 1
    } else if week <= 5 && month >= 11 {
        declared_year - 1
    } else {
        declared_year
    }
}

/// Calendar date for a mined month/day, `None` when it does not exist
pub fn resolve_mined_date(declared_year: i32, week: u32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(resolve_year(declared_year, week, month), month, day)
}

/// Where the seed date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    Override,
    DatetimeAttr,
    DateText,
    IsoWeek,
}

/// Infer the article's publication date, the anchor for positional dates.
///
/// Order: override table, `datetime` attribute on a date element, a
/// `YYYY年M月D日`-style date in a date element, Monday of the URL's ISO week.
pub fn infer_seed_date(
    document: &Html,
    article: &ArticleRef,
    rules: &ExtractionRules,
    selectors: &PageSelectors,
) -> Option<(NaiveDate, SeedSource)> {
    if let Some(start) = rules.override_for(&article.url) {
        return Some((start, SeedSource::Override));
    }

    let elements = || {
        selectors
            .publish_date
            .iter()
            .flat_map(|selector| document.select(selector))
    };

    if let Some(date) = elements()
        .filter_map(|el| el.value().attr("datetime"))
        .find_map(parse_datetime_attr)
    {
        return Some((date, SeedSource::DatetimeAttr));
    }

    if let Some(date) = elements().find_map(|el| parse_text_date(&el.text().collect::<String>())) {
        return Some((date, SeedSource::DateText));
    }

    iso_week_monday(article.year, article.week).map(|d| (d, SeedSource::IsoWeek))
}

/// Parse a machine-readable timestamp; the date is taken in its own offset
pub fn parse_datetime_attr(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Find a `2025年12月15日`, `2025-12-15` or `2025/12/15` date in text
pub fn parse_text_date(text: &str) -> Option<NaiveDate> {
    TEXT_DATE_REGEX.captures_iter(text).find_map(|caps| {
        let year = caps.get(1)?.as_str().parse().ok()?;
        let month = caps.get(2)?.as_str().parse().ok()?;
        let day = caps.get(3)?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

/// Inputs shared by both assignment passes
pub struct AssignContext<'a> {
    pub article: &'a ArticleRef,
    pub article_title: &'a str,
    pub seed: NaiveDate,
    /// Start date when the article is in the override table
    pub override_start: Option<NaiveDate>,
    pub days_per_week: usize,
}

/// Turn reconciled pairs into dated entries.
///
/// Mined pass: each pair with a block gets its mined date, or
/// `override_start + assigned so far` for an overridden week. A pair whose
/// date is taken is skipped and its block returned to the pool.
///
/// Fallback pass: while fewer than `days_per_week` dates are assigned, days
/// `seed + i` for `i < min(days_per_week, blocks)` go to the next unconsumed
/// titled block in block order.
pub fn assign_dates(
    ctx: &AssignContext,
    reconciled: &[Reconciled],
    mined: &MinedTable,
    blocks: &[RawBlock],
    consumed: &mut ConsumedBlocks,
    stats: &mut BatchStats,
) -> Vec<ResolvedEntry> {
    let mut assigned: HashSet<NaiveDate> = HashSet::new();
    let mut entries = Vec::new();

    for pair in reconciled {
        let Some(block) = pair.block.map(|i| &blocks[i]) else {
            continue;
        };
        let Some(mined_pair) = mined.entries().get(pair.mined) else {
            continue;
        };

        let (date, source) = match ctx.override_start {
            Some(start) => (start + Duration::days(assigned.len() as i64), DateSource::Override),
            None => (mined_pair.date, DateSource::Mined),
        };

        if !assigned.insert(date) {
            debug!(date = %date, title = %mined_pair.display_title, "Date already assigned, releasing block");
            consumed.release(&block.product_url);
            stats.dropped += 1;
            continue;
        }

        let title = if block.has_title() {
            block.title.clone()
        } else {
            mined_pair.display_title.clone()
        };
        entries.push(make_entry(ctx, block, title, date, source));
    }

    if assigned.len() < ctx.days_per_week && !blocks.is_empty() {
        let mut cursor = 0;
        for offset in 0..ctx.days_per_week.min(blocks.len()) {
            let date = ctx.seed + Duration::days(offset as i64);
            if assigned.contains(&date) {
                continue;
            }

            let Some(block) = next_free_block(blocks, consumed, &mut cursor) else {
                break;
            };
            consumed.consume(&block.product_url);
            assigned.insert(date);
            stats.fallback += 1;
            entries.push(make_entry(ctx, block, block.title.clone(), date, DateSource::Fallback));
        }
    }

    if entries.len() < ctx.days_per_week {
        info!(
            url = %ctx.article.url,
            entries = entries.len(),
            "Week resolved with fewer entries than days"
        );
    }

    entries
}

fn next_free_block<'b>(
    blocks: &'b [RawBlock],
    consumed: &ConsumedBlocks,
    cursor: &mut usize,
) -> Option<&'b RawBlock> {
    while *cursor < blocks.len() {
        let block = &blocks[*cursor];
        *cursor += 1;
        if block.has_title() && !consumed.is_consumed(&block.product_url) {
            return Some(block);
        }
    }
    None
}

fn make_entry(
    ctx: &AssignContext,
    block: &RawBlock,
    title: String,
    date: NaiveDate,
    source: DateSource,
) -> ResolvedEntry {
    ResolvedEntry {
        title,
        product_url: block.product_url.clone(),
        article_url: ctx.article.url.clone(),
        article_title: ctx.article_title.to_string(),
        excerpt: block.excerpt.clone(),
        date,
        week: ctx.article.week,
        year: ctx.article.year,
        source,
    }
}
