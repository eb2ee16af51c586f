//! Cross-run merge and same-date collision resolution
//!
//! Within one article the date assigner already guarantees distinct dates.
//! Across articles and runs two things can still go wrong:
//! - the same book shows up again (re-crawl, republished week)
//! - two books claim the same day (overlapping weeks, Simplified/Traditional
//!   variants of one listing)
//!
//! [`merge_entries`] handles the first, keyed by canonical product URL.
//! [`resolve_date_collisions`] handles the second, preferring the title that
//! reads as Traditional Chinese.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::config::ExtractionRules;
use crate::models::ResolvedEntry;

/// Merge newly resolved entries into the stored set.
///
/// When both sides hold the same product URL the entry with the later date
/// wins; on equal dates the incoming entry replaces the stored one. Stored
/// order is kept (replacements happen in place) and new URLs are appended in
/// incoming order.
pub fn merge_entries(stored: Vec<ResolvedEntry>, incoming: Vec<ResolvedEntry>) -> Vec<ResolvedEntry> {
    let mut merged = stored;
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, e)| (e.product_url.clone(), i))
        .collect();

    for entry in incoming {
        match index.get(&entry.product_url) {
            Some(&i) => {
                if entry.date >= merged[i].date {
                    merged[i] = entry;
                } else {
                    debug!(url = %entry.product_url, "Keeping later stored date");
                }
            }
            None => {
                index.insert(entry.product_url.clone(), merged.len());
                merged.push(entry);
            }
        }
    }

    merged
}

/// +1 per Traditional reference character, -1 per Simplified one
///
/// ```
/// use kobo99::storage::dedup::score_traditional;
///
/// assert_eq!(score_traditional("說書人與電腦", "說電腦", "说电脑"), 3);
/// assert_eq!(score_traditional("说书人与电脑", "說電腦", "说电脑"), -3);
/// ```
pub fn score_traditional(title: &str, traditional: &str, simplified: &str) -> i32 {
    title.chars().fold(0, |score, c| {
        if traditional.contains(c) {
            score + 1
        } else if simplified.contains(c) {
            score - 1
        } else {
            score
        }
    })
}

/// Keep one entry per date, sorted by date.
///
/// The highest [`score_traditional`] wins; ties keep the earliest entry in
/// input order, so the result is deterministic for a given input.
pub fn resolve_date_collisions(entries: Vec<ResolvedEntry>, rules: &ExtractionRules) -> Vec<ResolvedEntry> {
    let mut by_date: BTreeMap<NaiveDate, (i32, ResolvedEntry)> = BTreeMap::new();

    for entry in entries {
        let score = score_traditional(&entry.title, &rules.traditional_markers, &rules.simplified_markers);
        match by_date.get(&entry.date) {
            Some((best, kept)) if *best >= score => {
                debug!(date = %entry.date, kept = %kept.title, dropped = %entry.title, "Date collision");
            }
            _ => {
                by_date.insert(entry.date, (score, entry));
            }
        }
    }

    by_date.into_values().map(|(_, entry)| entry).collect()
}
