//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use regex::Regex;
use std::sync::OnceLock;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Truncate text to at most `max_chars` characters, appending `suffix` when cut.
///
/// Counts `char`s, not bytes, so CJK text is never split mid-codepoint.
pub fn truncate_chars(text: &str, max_chars: usize, keep: usize, suffix: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(suffix);
    out
}
