//! Text sanitization for titles and excerpts
//!
//! Three different normalizations are used by the pipeline and must not be
//! confused:
//!
//! - [`clean_title`] produces the display title stored on an entry
//! - [`mining_key`] produces the lookup key for mined titles
//! - [`canonical_title`] produces the comparison form used by reconciliation

use regex::Regex;
use std::sync::LazyLock;

use crate::utils::{normalize_whitespace, truncate_chars};

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());

/// Remove zero-width spaces and similar invisible characters
///
/// # Examples
///
/// ```
/// use kobo99::parser::sanitize::remove_zero_width;
///
/// assert_eq!(remove_zero_width("破\u{200B}咒\u{FEFF}師"), "破咒師");
/// ```
pub fn remove_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(*c,
                '\u{200B}'..='\u{200F}' |
                '\u{2028}'..='\u{202F}' |
                '\u{FEFF}'
            )
        })
        .collect()
}

/// Remove every occurrence of the boilerplate phrases, longest first, until
/// nothing changes. Repeating until stable keeps the function idempotent even
/// when a removal joins the halves of another phrase.
pub fn strip_boilerplate(text: &str, phrases: &[String]) -> String {
    let mut ordered: Vec<&str> = phrases
        .iter()
        .map(String::as_str)
        .filter(|p| !p.is_empty())
        .collect();
    ordered.sort_by_key(|p| std::cmp::Reverse(p.chars().count()));

    let mut current = normalize_whitespace(text);
    loop {
        let mut next = current.clone();
        for phrase in &ordered {
            next = next.replace(phrase, "");
        }
        let next = normalize_whitespace(&next);
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Display title: invisible characters and boilerplate removed, whitespace
/// collapsed, trimmed.
///
/// ```
/// use kobo99::parser::sanitize::clean_title;
///
/// let phrases = vec!["查看電子書".to_string()];
/// assert_eq!(clean_title("  破咒師 查看電子書 ", &phrases), "破咒師");
/// ```
pub fn clean_title(raw: &str, phrases: &[String]) -> String {
    strip_boilerplate(&remove_zero_width(raw), phrases)
}

/// True when `title` is exactly one of the boilerplate phrases
pub fn is_boilerplate(title: &str, phrases: &[String]) -> bool {
    let title = title.trim();
    phrases.iter().any(|p| p.trim() == title)
}

/// Lookup key for a mined title: brackets removed, whitespace collapsed
pub fn mining_key(title: &str, bracket_chars: &str) -> String {
    let stripped: String = remove_zero_width(title)
        .chars()
        .filter(|c| !bracket_chars.contains(*c))
        .collect();
    normalize_whitespace(&stripped)
}

/// Comparison form: lower-cased with punctuation and all whitespace removed
pub fn canonical_title(title: &str, strip_chars: &str) -> String {
    remove_zero_width(title)
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !strip_chars.contains(*c))
        .collect()
}

/// Excerpt from block text: URLs and price/call-to-action text removed,
/// whitespace collapsed, long text cut at `keep` characters plus an ellipsis.
pub fn clean_excerpt(text: &str, strip: &Regex, max_chars: usize, keep_chars: usize) -> String {
    let without_urls = URL_REGEX.replace_all(text, "");
    let without_prices = strip.replace_all(&without_urls, "");
    let cleaned = normalize_whitespace(&remove_zero_width(&without_prices));
    truncate_chars(&cleaned, max_chars, keep_chars, "…")
}
