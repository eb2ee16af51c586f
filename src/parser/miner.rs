//! Date-text mining
//!
//! Articles announce each daily pick with a line such as
//! `12/20週六Kobo99選書：《破咒師》`. The miner scans the article text for these
//! announcements and builds a title → date table.
//!
//! Two patterns are tried in order:
//!
//! 1. strict: `M/D weekday label：title`, title bracketed or plain to end of line
//! 2. loose: `M/D weekday ... 《title》`, any text before a bracketed title
//!
//! Text nodes are joined with newlines, so whitespace (including line breaks)
//! is tolerated between the date, weekday, label and title.

use regex::{Captures, Regex};
use tracing::debug;

use crate::config::ExtractionRules;
use crate::models::{ArticleRef, MinedDateTitle, MinedTable};
use crate::parser::dates::resolve_mined_date;
use crate::parser::sanitize::mining_key;
use crate::utils::error::ParseError;

const DATE: &str = r"(\d{1,2})\s*/\s*(\d{1,2})";
const WEEKDAY: &str = r"[（(]?\s*(?:週|周|星期)[一二三四五六日天]\s*[）)]?";
const OPEN_BRACKETS: &str = "《「『【";
const CLOSE_BRACKETS: &str = "》」』】";

/// Compiled mining patterns
pub struct DateMiner {
    patterns: Vec<Regex>,
    bracket_chars: String,
}

impl DateMiner {
    pub fn new(rules: &ExtractionRules) -> Result<Self, ParseError> {
        let labels = label_alternation(&rules.selection_labels);
        let bracketed = format!("[{OPEN_BRACKETS}]\\s*([^{CLOSE_BRACKETS}\\n]+?)\\s*[{CLOSE_BRACKETS}]");

        let strict = format!(
            r"{DATE}\s*{WEEKDAY}\s*(?:{labels})\s*[：:]\s*(?:{bracketed}|([^\n]+))"
        );
        let loose = format!(
            r"{DATE}\s*{WEEKDAY}[^{OPEN_BRACKETS}\n]*\n?[^{OPEN_BRACKETS}\n]*?{bracketed}"
        );

        let patterns = [strict, loose]
            .into_iter()
            .map(|p| {
                Regex::new(&p).map_err(|e| ParseError::InvalidPattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns,
            bracket_chars: rules.title_bracket_chars.clone(),
        })
    }

    /// Mine every announced (date, title) pair from `text`.
    ///
    /// The first pattern and first mention win per normalized title. Pairs
    /// whose month/day is not a real date in the resolved year are dropped.
    pub fn mine(&self, text: &str, article: &ArticleRef) -> MinedTable {
        let mut table = MinedTable::new();

        for (index, pattern) in self.patterns.iter().enumerate() {
            for caps in pattern.captures_iter(text) {
                let Some(mined) = self.to_mined(&caps, article) else {
                    continue;
                };
                if table.insert(mined) {
                    debug!(pattern = index, "Mined dated title");
                }
            }
        }

        table
    }

    fn to_mined(&self, caps: &Captures, article: &ArticleRef) -> Option<MinedDateTitle> {
        let month: u32 = caps.get(1)?.as_str().parse().ok()?;
        let day: u32 = caps.get(2)?.as_str().parse().ok()?;
        let raw_title = caps.get(3).or_else(|| caps.get(4))?.as_str();

        let display_title = mining_key(raw_title, &self.bracket_chars);
        if display_title.is_empty() {
            return None;
        }

        let Some(date) = resolve_mined_date(article.year, article.week, month, day) else {
            debug!(month, day, title = %display_title, "Discarding impossible mined date");
            return None;
        };

        Some(MinedDateTitle {
            key: display_title.clone(),
            display_title,
            month,
            day,
            date,
        })
    }
}

/// Regex alternation of the configured labels; spaces match any whitespace
fn label_alternation(labels: &[String]) -> String {
    labels
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            l.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s*")
        })
        .collect::<Vec<_>>()
        .join("|")
}
